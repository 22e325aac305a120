//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.

/// Users table schema
pub mod users {
    /// Table name
    pub const TABLE: &str = "users";
    /// Primary key column
    pub const ID: &str = "id";
    /// Unique email column
    pub const EMAIL: &str = "email";
    /// Unique username column
    pub const USERNAME: &str = "username";
    /// Argon2 password hash column
    pub const PASSWORD_HASH: &str = "password_hash";
}

/// Organisations table schema
pub mod organisations {
    /// Table name
    pub const TABLE: &str = "organisations";
    /// Primary key column
    pub const ID: &str = "id";
    /// Unique organisation name column
    pub const NAME: &str = "name";
}

/// Bots table schema
pub mod bots {
    /// Table name
    pub const TABLE: &str = "bots";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to organisations table
    pub const OWNER_ID: &str = "owner_id";
    /// Unique bot username column
    pub const USERNAME: &str = "username";
    /// Display nickname column
    pub const NICKNAME: &str = "nickname";
    /// Avatar image column
    pub const IMAGE: &str = "image";
    /// Profile background color column
    pub const BACKGROUND_COLOR: &str = "background_color";
}

/// Posts table schema
pub mod posts {
    /// Table name
    pub const TABLE: &str = "posts";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to bots table
    pub const OWNER_ID: &str = "owner_id";
    /// Free-text content column
    pub const CONTENT: &str = "content";
}

/// Tags table schema
pub mod tags {
    /// Table name
    pub const TABLE: &str = "tags";
    /// Primary key column
    pub const ID: &str = "id";
    /// Tag name column (deduplicated by lookup, not constraint)
    pub const NAME: &str = "name";
}

/// Post/tag association table schema
pub mod tagmap {
    /// Table name
    pub const TABLE: &str = "tagmap";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to posts table
    pub const POST_ID: &str = "post_id";
    /// Foreign key to tags table
    pub const TAG_ID: &str = "tag_id";
}

/// Post/mentioned-bot association table schema
pub mod mentionmap {
    /// Table name
    pub const TABLE: &str = "mentionmap";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to posts table
    pub const POST_ID: &str = "post_id";
    /// Foreign key to the mentioned bot
    pub const MENTION_ID: &str = "mention_id";
}

/// User/post favorite association table schema
pub mod favoritemap {
    /// Table name
    pub const TABLE: &str = "favoritemap";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to users table
    pub const USER_ID: &str = "user_id";
    /// Foreign key to posts table
    pub const POST_ID: &str = "post_id";
}

/// Follow association table schema
///
/// Exactly one of `bot_id`/`tag_id` is set per row; the pair is surfaced in
/// code as [`crate::models::FollowTarget`].
pub mod followingmap {
    /// Table name
    pub const TABLE: &str = "followingmap";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to the following user
    pub const FOLLOWER_ID: &str = "follower_id";
    /// Followed bot column (nullable)
    pub const BOT_ID: &str = "bot_id";
    /// Followed tag column (nullable)
    pub const TAG_ID: &str = "tag_id";
}
