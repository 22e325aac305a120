//! The relationship store: favorites, follows, tag memberships, mentions.
//!
//! Every mutation runs a duplicate/absence check first and surfaces the
//! failure as a domain error, never silently. The check and the insert are
//! separate statements; the backing store's per-statement isolation is the
//! only guard against concurrent duplicates (a documented gap, kept as-is).

use rusqlite::{params, Connection};

use crate::error::{Result, SocialError};
use crate::models::{Follow, FollowTarget};
use crate::schema::{favoritemap, followingmap, mentionmap, tagmap};

// ---- Favorites ----

/// Whether a (user, post) favorite exists
pub fn favorite_exists(conn: &Connection, user_id: i64, post_id: i64) -> Result<bool> {
    let exists = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ? AND {} = ?)",
            favoritemap::TABLE,
            favoritemap::USER_ID,
            favoritemap::POST_ID
        ),
        params![user_id, post_id],
        |row| row.get(0),
    )?;

    Ok(exists)
}

/// Record a favorite; `Conflict` if the identical association already exists
pub fn create_favorite(conn: &Connection, user_id: i64, post_id: i64) -> Result<()> {
    if favorite_exists(conn, user_id, post_id)? {
        return Err(SocialError::Conflict(format!(
            "Post with id {post_id} already is in your favorites"
        )));
    }

    conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            favoritemap::TABLE,
            favoritemap::USER_ID,
            favoritemap::POST_ID
        ),
        params![user_id, post_id],
    )?;

    metrics::counter!("botfeed_associations_total", "kind" => "favorite", "op" => "create")
        .increment(1);

    Ok(())
}

/// Remove a favorite; `Conflict` if no such association exists
pub fn remove_favorite(conn: &Connection, user_id: i64, post_id: i64) -> Result<()> {
    if !favorite_exists(conn, user_id, post_id)? {
        return Err(SocialError::Conflict(format!(
            "Post with id {post_id} is not in your favorites"
        )));
    }

    conn.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ? AND {} = ?",
            favoritemap::TABLE,
            favoritemap::USER_ID,
            favoritemap::POST_ID
        ),
        params![user_id, post_id],
    )?;

    metrics::counter!("botfeed_associations_total", "kind" => "favorite", "op" => "remove")
        .increment(1);

    Ok(())
}

// ---- Follows ----

/// Whether a follow of the given target exists for the follower
pub fn follow_exists(conn: &Connection, follower_id: i64, target: FollowTarget) -> Result<bool> {
    let exists = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ? AND {} = ?)",
            followingmap::TABLE,
            followingmap::FOLLOWER_ID,
            target.column()
        ),
        params![follower_id, target.id()],
        |row| row.get(0),
    )?;

    Ok(exists)
}

/// Record a follow; `Conflict` if the follower already follows the target
pub fn create_follow(conn: &Connection, follower_id: i64, target: FollowTarget) -> Result<()> {
    if follow_exists(conn, follower_id, target)? {
        return Err(SocialError::Conflict(format!(
            "You are already following the {} with id {}",
            target.kind(),
            target.id()
        )));
    }

    conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            followingmap::TABLE,
            followingmap::FOLLOWER_ID,
            target.column()
        ),
        params![follower_id, target.id()],
    )?;

    metrics::counter!("botfeed_associations_total", "kind" => "follow", "op" => "create")
        .increment(1);

    Ok(())
}

/// Remove a follow; `Conflict` if the follower does not follow the target
pub fn remove_follow(conn: &Connection, follower_id: i64, target: FollowTarget) -> Result<()> {
    if !follow_exists(conn, follower_id, target)? {
        return Err(SocialError::Conflict(format!(
            "You are not following the {} with id {}",
            target.kind(),
            target.id()
        )));
    }

    conn.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ? AND {} = ?",
            followingmap::TABLE,
            followingmap::FOLLOWER_ID,
            target.column()
        ),
        params![follower_id, target.id()],
    )?;

    metrics::counter!("botfeed_associations_total", "kind" => "follow", "op" => "remove")
        .increment(1);

    Ok(())
}

/// All follows of a user, bot and tag targets alike
pub fn follows_of_user(conn: &Connection, follower_id: i64) -> Result<Vec<Follow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT * FROM {} WHERE {} = ?",
        followingmap::TABLE,
        followingmap::FOLLOWER_ID
    ))?;

    let rows = stmt.query_map(params![follower_id], Follow::from_row)?;

    let mut follows = Vec::new();
    for follow in rows {
        follows.push(follow?);
    }

    Ok(follows)
}

/// Post ids a user has favorited
pub fn favorites_of_user(conn: &Connection, user_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} WHERE {} = ?",
        favoritemap::ID,
        favoritemap::TABLE,
        favoritemap::USER_ID
    ))?;

    let rows = stmt.query_map(params![user_id], |row| row.get::<_, i64>(0))?;

    let mut ids = Vec::new();
    for id in rows {
        ids.push(id?);
    }

    Ok(ids)
}

/// Delete every follow and favorite of a user, one row at a time.
///
/// Each delete commits on its own; there is no wrapping transaction, matching
/// the per-statement commit model of the rest of the store.
pub fn delete_user_associations(conn: &Connection, user_id: i64) -> Result<()> {
    for follow in follows_of_user(conn, user_id)? {
        conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?", followingmap::TABLE, followingmap::ID),
            params![follow.id],
        )?;
    }

    for favorite_id in favorites_of_user(conn, user_id)? {
        conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?", favoritemap::TABLE, favoritemap::ID),
            params![favorite_id],
        )?;
    }

    Ok(())
}

// ---- Tag and mention maps ----

/// Associate a tag with a post
pub fn create_tag_map(conn: &Connection, post_id: i64, tag_id: i64) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            tagmap::TABLE,
            tagmap::POST_ID,
            tagmap::TAG_ID
        ),
        params![post_id, tag_id],
    )?;

    Ok(())
}

/// Record a bot mention on a post
pub fn create_mention(conn: &Connection, post_id: i64, mention_id: i64) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            mentionmap::TABLE,
            mentionmap::POST_ID,
            mentionmap::MENTION_ID
        ),
        params![post_id, mention_id],
    )?;

    Ok(())
}

// ---- Counters composed by the info aggregator ----

/// Favorites recorded for a post
pub fn count_favorites_for_post(conn: &Connection, post_id: i64) -> Result<i64> {
    let count = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?",
            favoritemap::TABLE,
            favoritemap::POST_ID
        ),
        params![post_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Posts a user has favorited
pub fn count_favorites_for_user(conn: &Connection, user_id: i64) -> Result<i64> {
    let count = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?",
            favoritemap::TABLE,
            favoritemap::USER_ID
        ),
        params![user_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Favorites summed across all posts owned by a bot
pub fn count_favorites_for_bot_posts(conn: &Connection, bot_id: i64) -> Result<i64> {
    let count = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE {} IN (SELECT id FROM posts WHERE owner_id = ?)",
            favoritemap::TABLE,
            favoritemap::POST_ID
        ),
        params![bot_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Followers of a bot or tag
pub fn count_followers(conn: &Connection, target: FollowTarget) -> Result<i64> {
    let count = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?",
            followingmap::TABLE,
            target.column()
        ),
        params![target.id()],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Bots or tags a user follows, selected by the non-null target column
pub fn count_following(conn: &Connection, follower_id: i64, target_column: &str) -> Result<i64> {
    let count = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ? AND {target_column} IS NOT NULL",
            followingmap::TABLE,
            followingmap::FOLLOWER_ID
        ),
        params![follower_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Posts carrying a tag
pub fn count_posts_for_tag(conn: &Connection, tag_id: i64) -> Result<i64> {
    let count = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?",
            tagmap::TABLE,
            tagmap::TAG_ID
        ),
        params![tag_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Mentions of a bot, excluding self-mentions in the bot's own posts
pub fn count_mentions_excluding_own_posts(conn: &Connection, bot_id: i64) -> Result<i64> {
    let count = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ? \
             AND {} NOT IN (SELECT id FROM posts WHERE owner_id = ?)",
            mentionmap::TABLE,
            mentionmap::MENTION_ID,
            mentionmap::POST_ID
        ),
        params![bot_id, bot_id],
        |row| row.get(0),
    )?;

    Ok(count)
}
