//! Derived counter snapshots for posts, bots, and tags.
//!
//! Each snapshot composes relationship-store queries; the viewer's personal
//! flag (`favorite`/`following`) is `None` when no viewer is supplied.

use rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    Bot, BotInfo, FavoriteCount, FollowTarget, FollowingCount, Post, PostInfo, Tag, TagInfo, User,
};
use crate::relations;
use crate::sampler::{population_count, PopulationFilter};
use crate::schema::followingmap;

/// Counter snapshot for a post, with the viewer's favorite flag
pub fn post_info(conn: &Connection, post: &Post, viewer: Option<&User>) -> Result<PostInfo> {
    let favorite = match viewer {
        None => None,
        Some(user) => Some(relations::favorite_exists(conn, user.id, post.id)?),
    };

    Ok(PostInfo {
        id: post.id,
        favorite,
        favorite_count: relations::count_favorites_for_post(conn, post.id)?,
    })
}

/// Counter snapshot for a bot, with the viewer's follow flag
pub fn bot_info(conn: &Connection, bot: &Bot, viewer: Option<&User>) -> Result<BotInfo> {
    let following = match viewer {
        None => None,
        Some(user) => Some(relations::follow_exists(
            conn,
            user.id,
            FollowTarget::Bot(bot.id),
        )?),
    };

    Ok(BotInfo {
        id: bot.id,
        following,
        post_count: population_count::<Post>(conn, &PopulationFilter::all().by_bot(bot.id))?,
        favorites_count: relations::count_favorites_for_bot_posts(conn, bot.id)?,
        followers_count: relations::count_followers(conn, FollowTarget::Bot(bot.id))?,
        mentioned_count: relations::count_mentions_excluding_own_posts(conn, bot.id)?,
    })
}

/// Counter snapshot for a tag, with the viewer's follow flag
pub fn tag_info(conn: &Connection, tag: &Tag, viewer: Option<&User>) -> Result<TagInfo> {
    let following = match viewer {
        None => None,
        Some(user) => Some(relations::follow_exists(
            conn,
            user.id,
            FollowTarget::Tag(tag.id),
        )?),
    };

    Ok(TagInfo {
        id: tag.id,
        following,
        post_count: relations::count_posts_for_tag(conn, tag.id)?,
        follower_count: relations::count_followers(conn, FollowTarget::Tag(tag.id))?,
    })
}

/// How many posts a user has favorited
pub fn favorite_posts_count(conn: &Connection, user: &User) -> Result<FavoriteCount> {
    Ok(FavoriteCount {
        id: user.id,
        favorite_count: relations::count_favorites_for_user(conn, user.id)?,
    })
}

/// How many bots a user follows
pub fn followed_bot_count(conn: &Connection, user: &User) -> Result<FollowingCount> {
    Ok(FollowingCount {
        id: user.id,
        following_count: relations::count_following(conn, user.id, followingmap::BOT_ID)?,
    })
}

/// How many tags a user follows
pub fn followed_tag_count(conn: &Connection, user: &User) -> Result<FollowingCount> {
    Ok(FollowingCount {
        id: user.id,
        following_count: relations::count_following(conn, user.id, followingmap::TAG_ID)?,
    })
}
