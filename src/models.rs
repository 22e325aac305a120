//! Data models for the social feed
//!
//! This module contains all data structures used throughout the application:
//! stored entities, insertion payloads, and the derived info snapshots
//! returned by the service layer.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// A registered user
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Database primary key
    pub id: i64,
    /// Unique email address
    pub email: String,
    /// Unique username
    pub username: String,
    /// Argon2 password hash, never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Registration payload
#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    /// Email address
    pub email: String,
    /// Username, must not contain `@`
    pub username: String,
    /// Plaintext password, hashed before storage
    pub password: String,
}

/// Payload for credential-guarded user updates
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    /// Current password, verified before any change is applied
    pub password: String,
    /// New email address, if changing
    pub email: Option<String>,
    /// New username, if changing
    pub username: Option<String>,
    /// New password, if changing
    pub new_password: Option<String>,
}

/// A named group owning bots
#[derive(Debug, Clone, Serialize)]
pub struct Organisation {
    /// Database primary key
    pub id: i64,
    /// Unique organisation name
    pub name: String,
}

/// A posting account owned by an organisation
#[derive(Debug, Clone, Serialize)]
pub struct Bot {
    /// Database primary key
    pub id: i64,
    /// Foreign key to the owning organisation
    pub owner_id: i64,
    /// Unique bot username
    pub username: String,
    /// Display nickname
    pub nickname: String,
    /// Avatar image reference
    pub image: Option<String>,
    /// Profile background color
    pub background_color: Option<String>,
}

/// Data for creating a new bot
#[derive(Debug, Clone)]
pub struct NewBot {
    /// Foreign key to the owning organisation
    pub owner_id: i64,
    /// Unique bot username
    pub username: String,
    /// Display nickname
    pub nickname: String,
    /// Avatar image reference
    pub image: Option<String>,
    /// Profile background color
    pub background_color: Option<String>,
}

/// A short post authored by a bot
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Database primary key
    pub id: i64,
    /// Foreign key to the authoring bot
    pub owner_id: i64,
    /// Free-text content
    pub content: String,
}

/// A hashtag
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    /// Database primary key
    pub id: i64,
    /// Lowercase tag name
    pub name: String,
}

/// The target of a follow: exactly one of a bot or a tag.
///
/// Stored as two nullable columns on the follow table; this variant type is
/// the only representation the rest of the crate sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowTarget {
    /// Following a bot by id
    Bot(i64),
    /// Following a tag by id
    Tag(i64),
}

impl FollowTarget {
    /// Column holding the target id for this variant
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Bot(_) => crate::schema::followingmap::BOT_ID,
            Self::Tag(_) => crate::schema::followingmap::TAG_ID,
        }
    }

    /// The followed entity's id
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Bot(id) | Self::Tag(id) => *id,
        }
    }

    /// Human-readable target kind, used in error messages
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bot(_) => "bot",
            Self::Tag(_) => "tag",
        }
    }
}

/// A stored follow association
#[derive(Debug, Clone)]
pub struct Follow {
    /// Database primary key
    pub id: i64,
    /// The following user
    pub follower_id: i64,
    /// The followed bot or tag
    pub target: FollowTarget,
}

impl Follow {
    /// Map a follow row, enforcing that exactly one target column is set.
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let bot_id: Option<i64> = row.get(crate::schema::followingmap::BOT_ID)?;
        let tag_id: Option<i64> = row.get(crate::schema::followingmap::TAG_ID)?;

        let target = match (bot_id, tag_id) {
            (Some(bot), None) => FollowTarget::Bot(bot),
            (None, Some(tag)) => FollowTarget::Tag(tag),
            _ => {
                return Err(rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Null,
                    "follow row must set exactly one of bot_id, tag_id".into(),
                ))
            },
        };

        Ok(Self {
            id: row.get(crate::schema::followingmap::ID)?,
            follower_id: row.get(crate::schema::followingmap::FOLLOWER_ID)?,
            target,
        })
    }
}

/// An entity kind the random sampler can draw from.
///
/// Implementations tie a table name to its row mapping so the exclusion,
/// clamping, and offset logic is written once for posts, bots, and tags.
pub trait Sampleable: Sized {
    /// Backing table name
    const TABLE: &'static str;

    /// Map a `SELECT *` row to the entity
    fn from_row(row: &Row) -> rusqlite::Result<Self>;

    /// Database primary key
    fn id(&self) -> i64;
}

impl Sampleable for Post {
    const TABLE: &'static str = crate::schema::posts::TABLE;

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(crate::schema::posts::ID)?,
            owner_id: row.get(crate::schema::posts::OWNER_ID)?,
            content: row.get(crate::schema::posts::CONTENT)?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl Sampleable for Bot {
    const TABLE: &'static str = crate::schema::bots::TABLE;

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(crate::schema::bots::ID)?,
            owner_id: row.get(crate::schema::bots::OWNER_ID)?,
            username: row.get(crate::schema::bots::USERNAME)?,
            nickname: row.get(crate::schema::bots::NICKNAME)?,
            image: row.get(crate::schema::bots::IMAGE)?,
            background_color: row.get(crate::schema::bots::BACKGROUND_COLOR)?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl Sampleable for Tag {
    const TABLE: &'static str = crate::schema::tags::TABLE;

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(crate::schema::tags::ID)?,
            name: row.get(crate::schema::tags::NAME)?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Derived counters for a post, with the viewer's favorite flag
#[derive(Debug, Clone, Serialize)]
pub struct PostInfo {
    /// Post id
    pub id: i64,
    /// Whether the viewer favorited this post; `None` for anonymous callers
    pub favorite: Option<bool>,
    /// Number of users who favorited this post
    pub favorite_count: i64,
}

/// Derived counters for a bot, with the viewer's follow flag
#[derive(Debug, Clone, Serialize)]
pub struct BotInfo {
    /// Bot id
    pub id: i64,
    /// Whether the viewer follows this bot; `None` for anonymous callers
    pub following: Option<bool>,
    /// Number of posts authored by this bot
    pub post_count: i64,
    /// Favorites summed across all of the bot's posts
    pub favorites_count: i64,
    /// Number of users following this bot
    pub followers_count: i64,
    /// Mentions of this bot, excluding self-mentions in its own posts
    pub mentioned_count: i64,
}

/// Derived counters for a tag, with the viewer's follow flag
#[derive(Debug, Clone, Serialize)]
pub struct TagInfo {
    /// Tag id
    pub id: i64,
    /// Whether the viewer follows this tag; `None` for anonymous callers
    pub following: Option<bool>,
    /// Number of posts carrying this tag
    pub post_count: i64,
    /// Number of users following this tag
    pub follower_count: i64,
}

/// A user's favorite-post counter
#[derive(Debug, Clone, Serialize)]
pub struct FavoriteCount {
    /// User id
    pub id: i64,
    /// Number of posts this user favorited
    pub favorite_count: i64,
}

/// A user's followed-bot or followed-tag counter
#[derive(Debug, Clone, Serialize)]
pub struct FollowingCount {
    /// User id
    pub id: i64,
    /// Number of follows of the queried kind
    pub following_count: i64,
}

/// A bearer token response
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    /// The signed token
    pub access_token: String,
    /// Always "bearer"
    pub token_type: String,
}

impl AccessToken {
    /// Wrap a signed token in the standard bearer envelope
    #[must_use]
    pub fn bearer(token: String) -> Self {
        Self {
            access_token: token,
            token_type: "bearer".to_string(),
        }
    }
}
