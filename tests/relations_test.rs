use tempfile::TempDir;

use botfeed::db::Database;
use botfeed::error::SocialError;
use botfeed::models::{FollowTarget, NewBot};
use botfeed::{relations, repository};

fn test_db() -> (TempDir, Database) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let db = Database::new(&db_url).expect("Failed to create database");
    (temp_dir, db)
}

/// One organisation, one bot, one post; returns (bot_id, post_id).
fn seed_post(db: &Database) -> (i64, i64) {
    let conn = db.get_connection().expect("conn");

    let organisation =
        repository::get_or_create_organisation(&conn, "Test Org").expect("organisation");
    let bot = repository::create_bot(
        &conn,
        &NewBot {
            owner_id: organisation.id,
            username: "test_bot".to_string(),
            nickname: "Test Bot".to_string(),
            image: None,
            background_color: None,
        },
    )
    .expect("bot");
    let post = repository::create_post(&conn, bot.id, "hello world").expect("post");

    (bot.id, post.id)
}

#[test]
fn test_double_favorite_conflicts() {
    let (_dir, db) = test_db();
    let (_bot_id, post_id) = seed_post(&db);
    let conn = db.get_connection().expect("conn");

    relations::create_favorite(&conn, 1, post_id).expect("first favorite");

    let second = relations::create_favorite(&conn, 1, post_id);
    assert!(matches!(second, Err(SocialError::Conflict(_))));
}

#[test]
fn test_unfavorite_of_never_favorited_conflicts() {
    let (_dir, db) = test_db();
    let (_bot_id, post_id) = seed_post(&db);
    let conn = db.get_connection().expect("conn");

    let result = relations::remove_favorite(&conn, 1, post_id);
    assert!(matches!(result, Err(SocialError::Conflict(_))));
}

#[test]
fn test_favorite_roundtrip() {
    let (_dir, db) = test_db();
    let (_bot_id, post_id) = seed_post(&db);
    let conn = db.get_connection().expect("conn");

    relations::create_favorite(&conn, 1, post_id).expect("favorite");
    assert!(relations::favorite_exists(&conn, 1, post_id).expect("exists"));
    assert_eq!(
        relations::count_favorites_for_post(&conn, post_id).expect("count"),
        1
    );

    relations::remove_favorite(&conn, 1, post_id).expect("unfavorite");
    assert!(!relations::favorite_exists(&conn, 1, post_id).expect("exists"));
}

#[test]
fn test_follow_conflicts_mirror_favorites() {
    let (_dir, db) = test_db();
    let (bot_id, _post_id) = seed_post(&db);
    let conn = db.get_connection().expect("conn");

    relations::create_follow(&conn, 1, FollowTarget::Bot(bot_id)).expect("follow");
    assert!(matches!(
        relations::create_follow(&conn, 1, FollowTarget::Bot(bot_id)),
        Err(SocialError::Conflict(_))
    ));

    relations::remove_follow(&conn, 1, FollowTarget::Bot(bot_id)).expect("unfollow");
    assert!(matches!(
        relations::remove_follow(&conn, 1, FollowTarget::Bot(bot_id)),
        Err(SocialError::Conflict(_))
    ));
}

#[test]
fn test_bot_and_tag_follows_are_distinct_targets() {
    let (_dir, db) = test_db();
    let conn = db.get_connection().expect("conn");
    let tag = repository::get_or_create_tag(&conn, "scifi").expect("tag");

    // The same numeric id as a bot target is a different association.
    relations::create_follow(&conn, 1, FollowTarget::Tag(tag.id)).expect("follow tag");
    assert!(!relations::follow_exists(&conn, 1, FollowTarget::Bot(tag.id)).expect("exists"));

    let follows = relations::follows_of_user(&conn, 1).expect("follows");
    assert_eq!(follows.len(), 1);
    assert_eq!(follows[0].target, FollowTarget::Tag(tag.id));
}

#[test]
fn test_follow_row_sets_exactly_one_target() {
    let (_dir, db) = test_db();
    let conn = db.get_connection().expect("conn");

    // The schema rejects rows violating the one-of-two invariant.
    let both = conn.execute(
        "INSERT INTO followingmap (follower_id, bot_id, tag_id) VALUES (1, 2, 3)",
        [],
    );
    assert!(both.is_err());

    let neither = conn.execute(
        "INSERT INTO followingmap (follower_id) VALUES (1)",
        [],
    );
    assert!(neither.is_err());
}

#[test]
fn test_delete_user_associations_removes_all_rows() {
    let (_dir, db) = test_db();
    let (bot_id, post_id) = seed_post(&db);
    let conn = db.get_connection().expect("conn");
    let tag = repository::get_or_create_tag(&conn, "news").expect("tag");

    relations::create_favorite(&conn, 1, post_id).expect("favorite");
    relations::create_follow(&conn, 1, FollowTarget::Bot(bot_id)).expect("follow bot");
    relations::create_follow(&conn, 1, FollowTarget::Tag(tag.id)).expect("follow tag");

    // Another user's rows must survive the cascade.
    relations::create_favorite(&conn, 2, post_id).expect("other favorite");
    relations::create_follow(&conn, 2, FollowTarget::Bot(bot_id)).expect("other follow");

    relations::delete_user_associations(&conn, 1).expect("cascade");

    assert!(relations::follows_of_user(&conn, 1).expect("follows").is_empty());
    assert_eq!(relations::count_favorites_for_user(&conn, 1).expect("count"), 0);

    assert_eq!(relations::follows_of_user(&conn, 2).expect("follows").len(), 1);
    assert_eq!(relations::count_favorites_for_user(&conn, 2).expect("count"), 1);
}

#[test]
fn test_mention_count_excludes_self_mentions() {
    let (_dir, db) = test_db();
    let conn = db.get_connection().expect("conn");

    let organisation =
        repository::get_or_create_organisation(&conn, "Test Org").expect("organisation");
    let mentioned = repository::create_bot(
        &conn,
        &NewBot {
            owner_id: organisation.id,
            username: "mentioned_bot".to_string(),
            nickname: "Mentioned".to_string(),
            image: None,
            background_color: None,
        },
    )
    .expect("bot");
    let other = repository::create_bot(
        &conn,
        &NewBot {
            owner_id: organisation.id,
            username: "other_bot".to_string(),
            nickname: "Other".to_string(),
            image: None,
            background_color: None,
        },
    )
    .expect("bot");

    // A self-mention in the bot's own post and a real mention elsewhere.
    let own_post =
        repository::create_post(&conn, mentioned.id, "about @mentioned_bot").expect("post");
    let other_post =
        repository::create_post(&conn, other.id, "hey @mentioned_bot").expect("post");
    relations::create_mention(&conn, own_post.id, mentioned.id).expect("self mention");
    relations::create_mention(&conn, other_post.id, mentioned.id).expect("mention");

    assert_eq!(
        relations::count_mentions_excluding_own_posts(&conn, mentioned.id).expect("count"),
        1
    );
}
