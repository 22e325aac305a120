//! The logical request surface.
//!
//! Each operation runs independently against a short-lived pooled connection;
//! there is no cross-request state beyond the store itself. An HTTP layer is
//! expected to parse requests and dispatch into these methods.

use rand::Rng;
use tracing::{debug, info};

use crate::auth::{PasswordAuthenticator, TokenIssuer};
use crate::config::{AppConfig, SamplingConfig};
use crate::db::Database;
use crate::error::{Result, SocialError};
use crate::models::{
    AccessToken, Bot, BotInfo, FavoriteCount, FollowTarget, FollowingCount, Post, PostInfo, Tag,
    TagInfo, User, UserCreate, UserUpdate,
};
use crate::sampler::{sample, PopulationFilter};
use crate::validation::InputValidator;
use crate::{info as info_queries, relations, repository};

/// Optional filters for a random-post draw
#[derive(Debug, Default)]
pub struct PostSampleQuery {
    /// Number of posts to draw; the configured default when `None`
    pub count: Option<i64>,
    /// Only posts carrying this tag
    pub by_tag: Option<i64>,
    /// Only posts owned by this bot
    pub by_bot: Option<i64>,
    /// Only posts owned by or mentioning this bot
    pub by_or_mentioned: Option<i64>,
    /// Only the calling user's favorites
    pub favorites_only: bool,
    /// Every whitespace-separated term must appear in the content
    pub content_filter: Option<String>,
    /// Post ids never to return
    pub exclude: Vec<i64>,
}

/// Optional filters for a random-bot or random-tag draw
#[derive(Debug, Default)]
pub struct FollowableSampleQuery {
    /// Number of entities to draw; the configured default when `None`
    pub count: Option<i64>,
    /// Only bots/tags the calling user follows
    pub following_only: bool,
    /// Ids never to return
    pub exclude: Vec<i64>,
}

/// The social backend service
pub struct SocialService {
    db: Database,
    passwords: PasswordAuthenticator,
    tokens: TokenIssuer,
    sampling: SamplingConfig,
    min_password_len: usize,
}

impl SocialService {
    /// Build the service over an initialized database
    #[must_use]
    pub fn new(db: Database, config: &AppConfig) -> Self {
        Self {
            db,
            passwords: PasswordAuthenticator::default(),
            tokens: TokenIssuer::new(&config.get_token_secret(), config.auth.token_ttl_secs),
            sampling: config.sampling.clone(),
            min_password_len: config.auth.min_password_len,
        }
    }

    // ---- Users ----

    /// Register a new user and return a bearer token for them
    pub async fn register_user(&self, new_user: UserCreate) -> Result<AccessToken> {
        InputValidator::validate_password(&new_user.password, self.min_password_len)?;
        InputValidator::validate_username(&new_user.username)?;
        InputValidator::validate_email(&new_user.email)?;

        let conn = self.db.get_connection()?;

        if repository::get_user_by_email_or_username(&conn, &new_user.email)?.is_some() {
            return Err(SocialError::Conflict("E-Mail already in use".to_string()));
        }
        if repository::get_user_by_email_or_username(&conn, &new_user.username)?.is_some() {
            return Err(SocialError::Conflict("Username already in use".to_string()));
        }

        let password_hash = self.passwords.hash(&new_user.password)?;
        let user =
            repository::create_user(&conn, &new_user.email, &new_user.username, &password_hash)?;

        info!(user_id = user.id, "Registered user");
        metrics::counter!("botfeed_users_registered_total").increment(1);

        Ok(AccessToken::bearer(self.tokens.issue(user.id)?))
    }

    /// Authenticate credentials and issue a bearer token
    pub async fn issue_token(&self, email_or_username: &str, password: &str) -> Result<AccessToken> {
        let conn = self.db.get_connection()?;

        let user = repository::get_user_by_email_or_username(&conn, email_or_username)?
            .ok_or_else(|| SocialError::Unauthorized("Invalid Credentials".to_string()))?;

        if !self.verify_password(&conn, &user, password)? {
            metrics::counter!("botfeed_auth_failures_total").increment(1);
            return Err(SocialError::Unauthorized("Invalid Credentials".to_string()));
        }

        Ok(AccessToken::bearer(self.tokens.issue(user.id)?))
    }

    /// Resolve a bearer token to its user
    pub async fn current_user(&self, token: &str) -> Result<User> {
        let user_id = self.tokens.user_id(token)?;

        let conn = self.db.get_connection()?;
        repository::get_user(&conn, user_id)?
            .ok_or_else(|| SocialError::Unauthorized("Could not validate credentials".to_string()))
    }

    /// Apply a credential-guarded update to a user
    pub async fn update_user(&self, user_id: i64, update: UserUpdate) -> Result<()> {
        let conn = self.db.get_connection()?;

        let user = repository::get_user(&conn, user_id)?
            .ok_or_else(|| SocialError::NotFound(format!("There is no user with id {user_id}")))?;

        if !self.verify_password(&conn, &user, &update.password)? {
            return Err(SocialError::Unauthorized("Wrong password".to_string()));
        }

        if let Some(username) = &update.username {
            InputValidator::validate_username(username)?;
            if repository::get_user_by_email_or_username(&conn, username)?.is_some() {
                return Err(SocialError::Conflict("Username already in use".to_string()));
            }
        }

        if let Some(email) = &update.email {
            InputValidator::validate_email(email)?;
            if repository::get_user_by_email_or_username(&conn, email)?.is_some() {
                return Err(SocialError::Conflict("Email already in use".to_string()));
            }
        }

        let new_hash = match &update.new_password {
            Some(new_password) => {
                InputValidator::validate_password(new_password, self.min_password_len)?;
                Some(self.passwords.hash(new_password)?)
            },
            None => None,
        };

        repository::update_user_fields(
            &conn,
            user.id,
            update.email.as_deref(),
            update.username.as_deref(),
            new_hash.as_deref(),
        )?;

        info!(user_id = user.id, "Updated user");

        Ok(())
    }

    /// Delete a user after verifying their password.
    ///
    /// The user's follows and favorites go first, row by row, then the user.
    pub async fn delete_user(&self, user_id: i64, password: &str) -> Result<()> {
        let conn = self.db.get_connection()?;

        let user = repository::get_user(&conn, user_id)?
            .ok_or_else(|| SocialError::NotFound(format!("There is no user with id {user_id}")))?;

        if !self.verify_password(&conn, &user, password)? {
            return Err(SocialError::Unauthorized("Wrong password".to_string()));
        }

        relations::delete_user_associations(&conn, user.id)?;
        repository::delete_user(&conn, user.id)?;

        info!(user_id = user.id, "Deleted user");

        Ok(())
    }

    /// How many posts the user has favorited
    pub async fn favorite_posts_count(&self, user: &User) -> Result<FavoriteCount> {
        let conn = self.db.get_connection()?;
        info_queries::favorite_posts_count(&conn, user)
    }

    /// How many bots the user follows
    pub async fn followed_bot_count(&self, user: &User) -> Result<FollowingCount> {
        let conn = self.db.get_connection()?;
        info_queries::followed_bot_count(&conn, user)
    }

    /// How many tags the user follows
    pub async fn followed_tag_count(&self, user: &User) -> Result<FollowingCount> {
        let conn = self.db.get_connection()?;
        info_queries::followed_tag_count(&conn, user)
    }

    /// Verify a password, transparently rehashing on policy upgrade.
    ///
    /// A malformed stored hash counts as a mismatch rather than an error.
    fn verify_password(
        &self,
        conn: &rusqlite::Connection,
        user: &User,
        password: &str,
    ) -> Result<bool> {
        match self.passwords.verify(password, &user.password_hash) {
            Ok(true) => {
                if self.passwords.needs_rehash(&user.password_hash).unwrap_or(true) {
                    let new_hash = self.passwords.hash(password)?;
                    repository::update_user_fields(conn, user.id, None, None, Some(&new_hash))?;
                    info!(user_id = user.id, "Rehashed password");
                }
                Ok(true)
            },
            Ok(false) => Ok(false),
            Err(error) => {
                debug!(user_id = user.id, %error, "Stored password hash rejected");
                Ok(false)
            },
        }
    }

    // ---- Posts ----

    /// Fetch a post by id
    pub async fn get_post(&self, post_id: i64) -> Result<Post> {
        let conn = self.db.get_connection()?;
        repository::require_post(&conn, post_id)
    }

    /// Draw random posts matching the query's filters
    pub async fn random_posts(&self, user: &User, query: PostSampleQuery) -> Result<Vec<Post>> {
        self.random_posts_with_rng(user, query, &mut rand::thread_rng())
    }

    /// [`Self::random_posts`] with an explicit random source, for
    /// deterministic draws
    pub fn random_posts_with_rng<R: Rng>(
        &self,
        user: &User,
        query: PostSampleQuery,
        rng: &mut R,
    ) -> Result<Vec<Post>> {
        let count = self.resolve_count(query.count)?;

        let mut filter = PopulationFilter::all();
        if let Some(tag_id) = query.by_tag {
            filter = filter.by_tag(tag_id);
        }
        if let Some(bot_id) = query.by_bot {
            filter = filter.by_bot(bot_id);
        }
        if let Some(bot_id) = query.by_or_mentioned {
            filter = filter.by_owner_or_mentioned(bot_id);
        }
        if query.favorites_only {
            filter = filter.favorites_of(user.id);
        }
        if let Some(content_filter) = &query.content_filter {
            filter = filter.content_contains_all(content_filter);
        }

        let mut exclude = query.exclude;
        let conn = self.db.get_connection()?;
        sample(&conn, &filter, count, &mut exclude, rng)
    }

    /// Counter snapshot for a post, with the viewer's favorite flag
    pub async fn post_info(&self, post_id: i64, viewer: Option<&User>) -> Result<PostInfo> {
        let conn = self.db.get_connection()?;
        let post = repository::require_post(&conn, post_id)?;
        info_queries::post_info(&conn, &post, viewer)
    }

    /// Favorite a post; `Conflict` if it already is a favorite
    pub async fn favorite_post(&self, post_id: i64, user: &User) -> Result<PostInfo> {
        let conn = self.db.get_connection()?;

        let post = repository::require_post(&conn, post_id)?;
        relations::create_favorite(&conn, user.id, post.id)?;

        info_queries::post_info(&conn, &post, Some(user))
    }

    /// Unfavorite a post; `Conflict` if it was not a favorite
    pub async fn unfavorite_post(&self, post_id: i64, user: &User) -> Result<PostInfo> {
        let conn = self.db.get_connection()?;

        let post = repository::require_post(&conn, post_id)?;
        relations::remove_favorite(&conn, user.id, post.id)?;

        info_queries::post_info(&conn, &post, Some(user))
    }

    // ---- Bots ----

    /// Resolve a bot by id or `@username`
    pub async fn get_bot(&self, reference: &str) -> Result<Bot> {
        let conn = self.db.get_connection()?;
        repository::get_bot_by_ref(&conn, reference)
    }

    /// Draw random bots, optionally restricted to those the user follows
    pub async fn random_bots(&self, user: &User, query: FollowableSampleQuery) -> Result<Vec<Bot>> {
        self.random_bots_with_rng(user, query, &mut rand::thread_rng())
    }

    /// [`Self::random_bots`] with an explicit random source
    pub fn random_bots_with_rng<R: Rng>(
        &self,
        user: &User,
        query: FollowableSampleQuery,
        rng: &mut R,
    ) -> Result<Vec<Bot>> {
        let count = self.resolve_count(query.count)?;

        let mut filter = PopulationFilter::all();
        if query.following_only {
            filter = filter.followed_bots_of(user.id);
        }

        let mut exclude = query.exclude;
        let conn = self.db.get_connection()?;
        sample(&conn, &filter, count, &mut exclude, rng)
    }

    /// Counter snapshot for a bot, with the viewer's follow flag
    pub async fn bot_info(&self, reference: &str, viewer: Option<&User>) -> Result<BotInfo> {
        let conn = self.db.get_connection()?;
        let bot = repository::get_bot_by_ref(&conn, reference)?;
        info_queries::bot_info(&conn, &bot, viewer)
    }

    /// Follow a bot; `Conflict` if already followed
    pub async fn follow_bot(&self, reference: &str, user: &User) -> Result<BotInfo> {
        let conn = self.db.get_connection()?;

        let bot = repository::get_bot_by_ref(&conn, reference)?;
        relations::create_follow(&conn, user.id, FollowTarget::Bot(bot.id))?;

        info_queries::bot_info(&conn, &bot, Some(user))
    }

    /// Unfollow a bot; `Conflict` if not followed
    pub async fn unfollow_bot(&self, reference: &str, user: &User) -> Result<BotInfo> {
        let conn = self.db.get_connection()?;

        let bot = repository::get_bot_by_ref(&conn, reference)?;
        relations::remove_follow(&conn, user.id, FollowTarget::Bot(bot.id))?;

        info_queries::bot_info(&conn, &bot, Some(user))
    }

    // ---- Tags ----

    /// Resolve a tag by id or `#name`
    pub async fn get_tag(&self, reference: &str) -> Result<Tag> {
        let conn = self.db.get_connection()?;
        repository::get_tag_by_ref(&conn, reference)
    }

    /// Draw random tags, optionally restricted to those the user follows
    pub async fn random_tags(&self, user: &User, query: FollowableSampleQuery) -> Result<Vec<Tag>> {
        self.random_tags_with_rng(user, query, &mut rand::thread_rng())
    }

    /// [`Self::random_tags`] with an explicit random source
    pub fn random_tags_with_rng<R: Rng>(
        &self,
        user: &User,
        query: FollowableSampleQuery,
        rng: &mut R,
    ) -> Result<Vec<Tag>> {
        let count = self.resolve_count(query.count)?;

        let mut filter = PopulationFilter::all();
        if query.following_only {
            filter = filter.followed_tags_of(user.id);
        }

        let mut exclude = query.exclude;
        let conn = self.db.get_connection()?;
        sample(&conn, &filter, count, &mut exclude, rng)
    }

    /// Counter snapshot for a tag, with the viewer's follow flag
    pub async fn tag_info(&self, reference: &str, viewer: Option<&User>) -> Result<TagInfo> {
        let conn = self.db.get_connection()?;
        let tag = repository::get_tag_by_ref(&conn, reference)?;
        info_queries::tag_info(&conn, &tag, viewer)
    }

    /// Follow a tag; `Conflict` if already followed
    pub async fn follow_tag(&self, reference: &str, user: &User) -> Result<TagInfo> {
        let conn = self.db.get_connection()?;

        let tag = repository::get_tag_by_ref(&conn, reference)?;
        relations::create_follow(&conn, user.id, FollowTarget::Tag(tag.id))?;

        info_queries::tag_info(&conn, &tag, Some(user))
    }

    /// Unfollow a tag; `Conflict` if not followed
    pub async fn unfollow_tag(&self, reference: &str, user: &User) -> Result<TagInfo> {
        let conn = self.db.get_connection()?;

        let tag = repository::get_tag_by_ref(&conn, reference)?;
        relations::remove_follow(&conn, user.id, FollowTarget::Tag(tag.id))?;

        info_queries::tag_info(&conn, &tag, Some(user))
    }

    /// Fill in the configured default count and enforce the ceiling
    fn resolve_count(&self, count: Option<i64>) -> Result<i64> {
        let count = count.unwrap_or(self.sampling.default_count);
        InputValidator::validate_sample_count(count, self.sampling.max_count)?;
        Ok(count)
    }
}
