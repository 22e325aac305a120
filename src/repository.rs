//! Entity lookup and persistence for users, organisations, bots, posts, tags.
//!
//! Bots and tags resolve by numeric id or by name, with the conventional
//! leading `@`/`#` stripped; missing entities surface as `NotFound`. Tag
//! uniqueness is lookup-before-insert, not a schema constraint.

use rusqlite::{params, types::Value, Connection, OptionalExtension, Row};

use crate::error::{Result, SocialError};
use crate::models::{Bot, NewBot, Organisation, Post, Sampleable, Tag, User};
use crate::schema::{bots, organisations, posts, tags, users};

fn map_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(users::ID)?,
        email: row.get(users::EMAIL)?,
        username: row.get(users::USERNAME)?,
        password_hash: row.get(users::PASSWORD_HASH)?,
    })
}

fn map_organisation(row: &Row) -> rusqlite::Result<Organisation> {
    Ok(Organisation {
        id: row.get(organisations::ID)?,
        name: row.get(organisations::NAME)?,
    })
}

// ---- Users ----

/// Get a user by primary key
pub fn get_user(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT * FROM {} WHERE {} = ?", users::TABLE, users::ID),
            params![user_id],
            map_user,
        )
        .optional()?;

    Ok(user)
}

/// Get a user by email or username; input containing `@` is treated as email
pub fn get_user_by_email_or_username(
    conn: &Connection,
    email_or_username: &str,
) -> Result<Option<User>> {
    let column = if email_or_username.contains('@') {
        users::EMAIL
    } else {
        users::USERNAME
    };

    let user = conn
        .query_row(
            &format!("SELECT * FROM {} WHERE {column} = ?", users::TABLE),
            params![email_or_username],
            map_user,
        )
        .optional()?;

    Ok(user)
}

/// Insert a new user with an already-hashed password
pub fn create_user(
    conn: &Connection,
    email: &str,
    username: &str,
    password_hash: &str,
) -> Result<User> {
    conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}, {}) VALUES (?, ?, ?)",
            users::TABLE,
            users::EMAIL,
            users::USERNAME,
            users::PASSWORD_HASH
        ),
        params![email, username, password_hash],
    )?;

    Ok(User {
        id: conn.last_insert_rowid(),
        email: email.to_string(),
        username: username.to_string(),
        password_hash: password_hash.to_string(),
    })
}

/// Apply the non-`None` field changes to a user row
pub fn update_user_fields(
    conn: &Connection,
    user_id: i64,
    email: Option<&str>,
    username: Option<&str>,
    password_hash: Option<&str>,
) -> Result<()> {
    let mut update_fields = Vec::new();
    let mut update_params: Vec<Value> = Vec::new();

    if let Some(email) = email {
        update_fields.push(format!("{} = ?", users::EMAIL));
        update_params.push(Value::Text(email.to_string()));
    }

    if let Some(username) = username {
        update_fields.push(format!("{} = ?", users::USERNAME));
        update_params.push(Value::Text(username.to_string()));
    }

    if let Some(password_hash) = password_hash {
        update_fields.push(format!("{} = ?", users::PASSWORD_HASH));
        update_params.push(Value::Text(password_hash.to_string()));
    }

    if update_fields.is_empty() {
        return Ok(());
    }

    update_params.push(Value::Integer(user_id));

    conn.execute(
        &format!(
            "UPDATE {} SET {} WHERE {} = ?",
            users::TABLE,
            update_fields.join(", "),
            users::ID
        ),
        rusqlite::params_from_iter(update_params),
    )?;

    Ok(())
}

/// Delete a user row. Associations are the caller's responsibility first.
pub fn delete_user(conn: &Connection, user_id: i64) -> Result<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE {} = ?", users::TABLE, users::ID),
        params![user_id],
    )?;

    Ok(())
}

// ---- Organisations ----

/// Get an organisation by name, creating it if absent
pub fn get_or_create_organisation(conn: &Connection, name: &str) -> Result<Organisation> {
    let existing = conn
        .query_row(
            &format!(
                "SELECT * FROM {} WHERE {} = ?",
                organisations::TABLE,
                organisations::NAME
            ),
            params![name],
            map_organisation,
        )
        .optional()?;

    if let Some(organisation) = existing {
        return Ok(organisation);
    }

    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES (?)",
            organisations::TABLE,
            organisations::NAME
        ),
        params![name],
    )?;

    Ok(Organisation {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

// ---- Posts ----

/// Get a post by primary key
pub fn get_post(conn: &Connection, post_id: i64) -> Result<Option<Post>> {
    let post = conn
        .query_row(
            &format!("SELECT * FROM {} WHERE {} = ?", posts::TABLE, posts::ID),
            params![post_id],
            Post::from_row,
        )
        .optional()?;

    Ok(post)
}

/// Get a post by primary key, failing with `NotFound` when absent
pub fn require_post(conn: &Connection, post_id: i64) -> Result<Post> {
    get_post(conn, post_id)?.ok_or_else(|| {
        SocialError::NotFound(format!("There is no post with id {post_id}"))
    })
}

/// Insert a new post for a bot
pub fn create_post(conn: &Connection, owner_id: i64, content: &str) -> Result<Post> {
    conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            posts::TABLE,
            posts::OWNER_ID,
            posts::CONTENT
        ),
        params![owner_id, content],
    )?;

    Ok(Post {
        id: conn.last_insert_rowid(),
        owner_id,
        content: content.to_string(),
    })
}

// ---- Bots ----

/// Get a bot by primary key
pub fn get_bot(conn: &Connection, bot_id: i64) -> Result<Option<Bot>> {
    let bot = conn
        .query_row(
            &format!("SELECT * FROM {} WHERE {} = ?", bots::TABLE, bots::ID),
            params![bot_id],
            Bot::from_row,
        )
        .optional()?;

    Ok(bot)
}

/// Get a bot by its unique username
pub fn get_bot_by_username(conn: &Connection, username: &str) -> Result<Option<Bot>> {
    let bot = conn
        .query_row(
            &format!("SELECT * FROM {} WHERE {} = ?", bots::TABLE, bots::USERNAME),
            params![username],
            Bot::from_row,
        )
        .optional()?;

    Ok(bot)
}

/// Resolve a bot by numeric id or username (leading `@` stripped)
pub fn get_bot_by_ref(conn: &Connection, reference: &str) -> Result<Bot> {
    if is_numeric_ref(reference) {
        let bot_id: i64 = reference
            .parse()
            .map_err(|_| SocialError::NotFound(format!("Bot with ID {reference} does not exist")))?;

        get_bot(conn, bot_id)?
            .ok_or_else(|| SocialError::NotFound(format!("Bot with ID {bot_id} does not exist")))
    } else {
        let username = reference.trim_start_matches('@');

        get_bot_by_username(conn, username)?.ok_or_else(|| {
            SocialError::NotFound(format!("Bot with username {username} does not exist"))
        })
    }
}

/// Insert a new bot
pub fn create_bot(conn: &Connection, new_bot: &NewBot) -> Result<Bot> {
    conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?)",
            bots::TABLE,
            bots::OWNER_ID,
            bots::USERNAME,
            bots::NICKNAME,
            bots::IMAGE,
            bots::BACKGROUND_COLOR
        ),
        params![
            new_bot.owner_id,
            new_bot.username,
            new_bot.nickname,
            new_bot.image,
            new_bot.background_color
        ],
    )?;

    Ok(Bot {
        id: conn.last_insert_rowid(),
        owner_id: new_bot.owner_id,
        username: new_bot.username.clone(),
        nickname: new_bot.nickname.clone(),
        image: new_bot.image.clone(),
        background_color: new_bot.background_color.clone(),
    })
}

// ---- Tags ----

/// Get a tag by primary key
pub fn get_tag(conn: &Connection, tag_id: i64) -> Result<Option<Tag>> {
    let tag = conn
        .query_row(
            &format!("SELECT * FROM {} WHERE {} = ?", tags::TABLE, tags::ID),
            params![tag_id],
            Tag::from_row,
        )
        .optional()?;

    Ok(tag)
}

/// Get a tag by name
pub fn get_tag_by_name(conn: &Connection, name: &str) -> Result<Option<Tag>> {
    let tag = conn
        .query_row(
            &format!("SELECT * FROM {} WHERE {} = ?", tags::TABLE, tags::NAME),
            params![name],
            Tag::from_row,
        )
        .optional()?;

    Ok(tag)
}

/// Resolve a tag by numeric id or name (leading `#` stripped)
pub fn get_tag_by_ref(conn: &Connection, reference: &str) -> Result<Tag> {
    if is_numeric_ref(reference) {
        let tag_id: i64 = reference.parse().map_err(|_| {
            SocialError::NotFound(format!("Tag with name {reference} does not exist"))
        })?;

        get_tag(conn, tag_id)?
            .ok_or_else(|| SocialError::NotFound(format!("Tag with id {tag_id} does not exist")))
    } else {
        let name = reference.trim_start_matches('#');

        get_tag_by_name(conn, name)?
            .ok_or_else(|| SocialError::NotFound(format!("Tag with name {name} does not exist")))
    }
}

/// Get a tag by name, creating it if absent.
///
/// This lookup-before-insert is the only uniqueness enforcement tags get.
pub fn get_or_create_tag(conn: &Connection, name: &str) -> Result<Tag> {
    if let Some(tag) = get_tag_by_name(conn, name)? {
        return Ok(tag);
    }

    conn.execute(
        &format!("INSERT INTO {} ({}) VALUES (?)", tags::TABLE, tags::NAME),
        params![name],
    )?;

    Ok(Tag {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

/// Whether a bot/tag reference is a bare numeric id
fn is_numeric_ref(reference: &str) -> bool {
    !reference.is_empty() && reference.chars().all(|c| c.is_ascii_digit())
}
