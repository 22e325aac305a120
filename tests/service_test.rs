use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

use botfeed::config::AppConfig;
use botfeed::db::Database;
use botfeed::error::SocialError;
use botfeed::models::{Bot, NewBot, Post, User, UserCreate, UserUpdate};
use botfeed::service::{FollowableSampleQuery, PostSampleQuery, SocialService};
use botfeed::{relations, repository};

fn test_service() -> (TempDir, Database, SocialService) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let db = Database::new(&db_url).expect("Failed to create database");

    let mut config = AppConfig::default();
    config.auth.token_secret = "test-secret".to_string();

    let service = SocialService::new(db.clone(), &config);
    (temp_dir, db, service)
}

async fn register(service: &SocialService, email: &str, username: &str) -> User {
    let token = service
        .register_user(UserCreate {
            email: email.to_string(),
            username: username.to_string(),
            password: "password123".to_string(),
        })
        .await
        .expect("register");

    service
        .current_user(&token.access_token)
        .await
        .expect("current user")
}

fn make_bot(db: &Database, username: &str) -> Bot {
    let conn = db.get_connection().expect("conn");
    let organisation =
        repository::get_or_create_organisation(&conn, "Test Org").expect("organisation");

    repository::create_bot(
        &conn,
        &NewBot {
            owner_id: organisation.id,
            username: username.to_string(),
            nickname: username.to_string(),
            image: None,
            background_color: None,
        },
    )
    .expect("bot")
}

fn make_post(db: &Database, bot_id: i64, content: &str) -> Post {
    let conn = db.get_connection().expect("conn");
    repository::create_post(&conn, bot_id, content).expect("post")
}

// ---- Registration and tokens ----

#[tokio::test]
async fn test_register_and_authenticate() {
    let (_dir, _db, service) = test_service();

    let user = register(&service, "alice@example.com", "alice").await;
    assert_eq!(user.username, "alice");

    // Both email and username resolve at the token endpoint.
    service
        .issue_token("alice@example.com", "password123")
        .await
        .expect("token by email");
    service
        .issue_token("alice", "password123")
        .await
        .expect("token by username");
}

#[tokio::test]
async fn test_register_rejects_malformed_input() {
    let (_dir, _db, service) = test_service();

    let short_password = service
        .register_user(UserCreate {
            email: "a@example.com".to_string(),
            username: "alice".to_string(),
            password: "12345".to_string(),
        })
        .await;
    assert!(matches!(short_password, Err(SocialError::Validation(_))));

    let at_in_username = service
        .register_user(UserCreate {
            email: "a@example.com".to_string(),
            username: "alice@home".to_string(),
            password: "password123".to_string(),
        })
        .await;
    assert!(matches!(at_in_username, Err(SocialError::Validation(_))));
}

#[tokio::test]
async fn test_register_rejects_duplicates() {
    let (_dir, _db, service) = test_service();
    register(&service, "alice@example.com", "alice").await;

    let same_email = service
        .register_user(UserCreate {
            email: "alice@example.com".to_string(),
            username: "alice2".to_string(),
            password: "password123".to_string(),
        })
        .await;
    assert!(matches!(same_email, Err(SocialError::Conflict(_))));

    let same_username = service
        .register_user(UserCreate {
            email: "alice2@example.com".to_string(),
            username: "alice".to_string(),
            password: "password123".to_string(),
        })
        .await;
    assert!(matches!(same_username, Err(SocialError::Conflict(_))));
}

#[tokio::test]
async fn test_bad_credentials_unauthorized() {
    let (_dir, _db, service) = test_service();
    register(&service, "alice@example.com", "alice").await;

    let wrong_password = service.issue_token("alice", "wrong-password").await;
    assert!(matches!(wrong_password, Err(SocialError::Unauthorized(_))));

    let unknown_user = service.issue_token("nobody", "password123").await;
    assert!(matches!(unknown_user, Err(SocialError::Unauthorized(_))));

    let garbage_token = service.current_user("not-a-token").await;
    assert!(matches!(garbage_token, Err(SocialError::Unauthorized(_))));
}

#[tokio::test]
async fn test_update_user_guarded_by_password() {
    let (_dir, _db, service) = test_service();
    let alice = register(&service, "alice@example.com", "alice").await;
    register(&service, "bob@example.com", "bob").await;

    let wrong_password = service
        .update_user(
            alice.id,
            UserUpdate {
                password: "wrong".to_string(),
                username: Some("alice_new".to_string()),
                ..UserUpdate::default()
            },
        )
        .await;
    assert!(matches!(wrong_password, Err(SocialError::Unauthorized(_))));

    let taken_username = service
        .update_user(
            alice.id,
            UserUpdate {
                password: "password123".to_string(),
                username: Some("bob".to_string()),
                ..UserUpdate::default()
            },
        )
        .await;
    assert!(matches!(taken_username, Err(SocialError::Conflict(_))));

    service
        .update_user(
            alice.id,
            UserUpdate {
                password: "password123".to_string(),
                username: Some("alice_new".to_string()),
                new_password: Some("password456".to_string()),
                ..UserUpdate::default()
            },
        )
        .await
        .expect("update");

    service
        .issue_token("alice_new", "password456")
        .await
        .expect("token with new credentials");
}

#[tokio::test]
async fn test_delete_user_cascades_associations() {
    let (_dir, db, service) = test_service();
    let alice = register(&service, "alice@example.com", "alice").await;

    let bot = make_bot(&db, "some_bot");
    let post = make_post(&db, bot.id, "hello");

    service.favorite_post(post.id, &alice).await.expect("favorite");
    service.follow_bot("some_bot", &alice).await.expect("follow");

    service
        .delete_user(alice.id, "password123")
        .await
        .expect("delete");

    let conn = db.get_connection().expect("conn");
    assert!(relations::follows_of_user(&conn, alice.id).expect("follows").is_empty());
    assert_eq!(
        relations::count_favorites_for_user(&conn, alice.id).expect("count"),
        0
    );
    assert!(repository::get_user(&conn, alice.id).expect("get").is_none());
}

// ---- Favorites and info ----

#[tokio::test]
async fn test_favorite_lifecycle_with_info() {
    let (_dir, db, service) = test_service();
    let alice = register(&service, "alice@example.com", "alice").await;
    let bot = make_bot(&db, "some_bot");
    let post = make_post(&db, bot.id, "hello");

    let info = service.favorite_post(post.id, &alice).await.expect("favorite");
    assert_eq!(info.favorite, Some(true));
    assert_eq!(info.favorite_count, 1);

    // Anonymous viewers get no personal flag.
    let anonymous = service.post_info(post.id, None).await.expect("info");
    assert_eq!(anonymous.favorite, None);
    assert_eq!(anonymous.favorite_count, 1);

    let again = service.favorite_post(post.id, &alice).await;
    assert!(matches!(again, Err(SocialError::Conflict(_))));

    let info = service.unfavorite_post(post.id, &alice).await.expect("unfavorite");
    assert_eq!(info.favorite, Some(false));
    assert_eq!(info.favorite_count, 0);

    let missing = service.favorite_post(999, &alice).await;
    assert!(matches!(missing, Err(SocialError::NotFound(_))));
}

#[tokio::test]
async fn test_follow_tag_info_flags() {
    let (_dir, db, service) = test_service();
    let alice = register(&service, "alice@example.com", "alice").await;

    {
        let conn = db.get_connection().expect("conn");
        repository::get_or_create_tag(&conn, "scifi").expect("tag");
    }

    let info = service.follow_tag("#scifi", &alice).await.expect("follow");
    assert_eq!(info.following, Some(true));
    assert_eq!(info.follower_count, 1);

    let anonymous = service.tag_info("#scifi", None).await.expect("info");
    assert_eq!(anonymous.following, None);

    let missing = service.follow_tag("#nosuchtag", &alice).await;
    assert!(matches!(missing, Err(SocialError::NotFound(_))));
}

#[tokio::test]
async fn test_bot_resolution_and_info_counts() {
    let (_dir, db, service) = test_service();
    let alice = register(&service, "alice@example.com", "alice").await;
    let bot = make_bot(&db, "some_bot");
    make_post(&db, bot.id, "first");
    make_post(&db, bot.id, "second");

    // Resolution by numeric id, username, and prefixed username.
    assert_eq!(service.get_bot(&bot.id.to_string()).await.expect("by id").id, bot.id);
    assert_eq!(service.get_bot("some_bot").await.expect("by name").id, bot.id);
    assert_eq!(service.get_bot("@some_bot").await.expect("prefixed").id, bot.id);

    let info = service.follow_bot("@some_bot", &alice).await.expect("follow");
    assert_eq!(info.following, Some(true));
    assert_eq!(info.post_count, 2);
    assert_eq!(info.followers_count, 1);
    assert_eq!(info.mentioned_count, 0);

    let unfollowed = service.unfollow_bot("@some_bot", &alice).await.expect("unfollow");
    assert_eq!(unfollowed.following, Some(false));
    assert_eq!(unfollowed.followers_count, 0);
}

// ---- Random sampling ----

#[tokio::test]
async fn test_random_posts_exclusion_clamps_count() {
    let (_dir, db, service) = test_service();
    let alice = register(&service, "alice@example.com", "alice").await;
    let bot = make_bot(&db, "some_bot");
    for i in 0..5 {
        make_post(&db, bot.id, &format!("post {i}"));
    }

    let mut rng = StdRng::seed_from_u64(5);
    let posts = service
        .random_posts_with_rng(
            &alice,
            PostSampleQuery {
                count: Some(10),
                exclude: vec![1, 2],
                ..PostSampleQuery::default()
            },
            &mut rng,
        )
        .expect("sample");

    let mut ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![3, 4, 5]);
}

#[tokio::test]
async fn test_random_posts_filters_compose() {
    let (_dir, db, service) = test_service();
    let alice = register(&service, "alice@example.com", "alice").await;
    let first = make_bot(&db, "first_bot");
    let second = make_bot(&db, "second_bot");

    let tagged = make_post(&db, first.id, "tagged space opera post");
    let plain = make_post(&db, first.id, "plain post");
    let other = make_post(&db, second.id, "second bot post");

    let tag = {
        let conn = db.get_connection().expect("conn");
        let tag = repository::get_or_create_tag(&conn, "scifi").expect("tag");
        relations::create_tag_map(&conn, tagged.id, tag.id).expect("tagmap");
        relations::create_mention(&conn, other.id, first.id).expect("mention");
        tag
    };

    let mut rng = StdRng::seed_from_u64(5);

    let by_bot = service
        .random_posts_with_rng(
            &alice,
            PostSampleQuery {
                by_bot: Some(second.id),
                ..PostSampleQuery::default()
            },
            &mut rng,
        )
        .expect("by bot");
    assert_eq!(by_bot.iter().map(|p| p.id).collect::<Vec<_>>(), vec![other.id]);

    let by_tag = service
        .random_posts_with_rng(
            &alice,
            PostSampleQuery {
                by_tag: Some(tag.id),
                ..PostSampleQuery::default()
            },
            &mut rng,
        )
        .expect("by tag");
    assert_eq!(by_tag.iter().map(|p| p.id).collect::<Vec<_>>(), vec![tagged.id]);

    // Owner-or-mentioned covers both the bot's posts and mentions of it.
    let mut reach = service
        .random_posts_with_rng(
            &alice,
            PostSampleQuery {
                by_or_mentioned: Some(first.id),
                ..PostSampleQuery::default()
            },
            &mut rng,
        )
        .expect("by or mentioned")
        .iter()
        .map(|p| p.id)
        .collect::<Vec<_>>();
    reach.sort_unstable();
    assert_eq!(reach, vec![tagged.id, plain.id, other.id]);

    let filtered = service
        .random_posts_with_rng(
            &alice,
            PostSampleQuery {
                content_filter: Some("space post".to_string()),
                ..PostSampleQuery::default()
            },
            &mut rng,
        )
        .expect("filtered");
    assert_eq!(filtered.iter().map(|p| p.id).collect::<Vec<_>>(), vec![tagged.id]);

    service.favorite_post(plain.id, &alice).await.expect("favorite");
    let favorites = service
        .random_posts_with_rng(
            &alice,
            PostSampleQuery {
                favorites_only: true,
                ..PostSampleQuery::default()
            },
            &mut rng,
        )
        .expect("favorites");
    assert_eq!(favorites.iter().map(|p| p.id).collect::<Vec<_>>(), vec![plain.id]);
}

#[tokio::test]
async fn test_random_bots_following_only() {
    let (_dir, db, service) = test_service();
    let alice = register(&service, "alice@example.com", "alice").await;
    let followed = make_bot(&db, "followed_bot");
    make_bot(&db, "ignored_bot");

    service.follow_bot("followed_bot", &alice).await.expect("follow");

    let mut rng = StdRng::seed_from_u64(5);
    let bots = service
        .random_bots_with_rng(
            &alice,
            FollowableSampleQuery {
                following_only: true,
                ..FollowableSampleQuery::default()
            },
            &mut rng,
        )
        .expect("sample");

    assert_eq!(bots.iter().map(|b| b.id).collect::<Vec<_>>(), vec![followed.id]);
}

#[tokio::test]
async fn test_random_tags_default_count() {
    let (_dir, db, service) = test_service();
    let alice = register(&service, "alice@example.com", "alice").await;

    {
        let conn = db.get_connection().expect("conn");
        for i in 0..8 {
            repository::get_or_create_tag(&conn, &format!("tag{i}")).expect("tag");
        }
    }

    let mut rng = StdRng::seed_from_u64(5);
    let tags = service
        .random_tags_with_rng(&alice, FollowableSampleQuery::default(), &mut rng)
        .expect("sample");

    // The configured default count caps the draw.
    assert_eq!(tags.len(), 5);

    let oversized = service.random_tags_with_rng(
        &alice,
        FollowableSampleQuery {
            count: Some(1000),
            ..FollowableSampleQuery::default()
        },
        &mut rng,
    );
    assert!(matches!(oversized, Err(SocialError::Validation(_))));
}

#[tokio::test]
async fn test_user_counters() {
    let (_dir, db, service) = test_service();
    let alice = register(&service, "alice@example.com", "alice").await;
    let bot = make_bot(&db, "some_bot");
    let post = make_post(&db, bot.id, "hello");

    {
        let conn = db.get_connection().expect("conn");
        repository::get_or_create_tag(&conn, "scifi").expect("tag");
    }

    service.favorite_post(post.id, &alice).await.expect("favorite");
    service.follow_bot("some_bot", &alice).await.expect("follow bot");
    service.follow_tag("#scifi", &alice).await.expect("follow tag");

    assert_eq!(
        service.favorite_posts_count(&alice).await.expect("count").favorite_count,
        1
    );
    assert_eq!(
        service.followed_bot_count(&alice).await.expect("count").following_count,
        1
    );
    assert_eq!(
        service.followed_tag_count(&alice).await.expect("count").following_count,
        1
    );
}
