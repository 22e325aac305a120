//! Offline seed import pipeline.
//!
//! Reads a seed SQLite database of synthetic characters and their generated
//! posts, then materializes the social graph: one organisation, one bot per
//! character, one post per seed post with character names rewritten to
//! `@mentions`, and `#tag`/`@mention` tokens parsed into the association
//! tables.

use regex::Regex;
use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use crate::config::ImportConfig;
use crate::db::Database;
use crate::error::{Result, SocialError};
use crate::logging::OperationTimer;
use crate::metrics::{MetricsCollector, MetricsTimer};
use crate::models::NewBot;
use crate::validation::InputValidator;
use crate::{relations, repository};

/// Counts of what an import run materialized
#[derive(Debug, Default)]
pub struct ImportSummary {
    /// Bots created (existing usernames are skipped)
    pub bots_created: usize,
    /// Posts imported
    pub posts_imported: usize,
    /// Seed posts skipped for missing owners
    pub posts_skipped: usize,
    /// Tag-map rows created
    pub tags_linked: usize,
    /// Mention rows created
    pub mentions_linked: usize,
}

/// A character row from the seed database
struct SeedCharacter {
    id: i64,
    username: String,
    nickname: Option<String>,
    image: Option<String>,
}

/// A bot materialized from a seed character, keyed by the seed character id
struct ImportedBot {
    seed_id: i64,
    bot_id: i64,
    bot_username: String,
    seed_username: String,
}

/// Run the import against the configured seed database.
///
/// Safe to re-run: organisations and bots resolve by name/username first,
/// so only seed posts are duplicated on repeat runs.
pub fn run(db: &Database, config: &ImportConfig) -> Result<ImportSummary> {
    let timer = OperationTimer::new("seed_import");
    let metrics_timer = MetricsTimer::new(MetricsCollector::default(), "seed_import");

    let seed = Connection::open(&config.seed_database_path).map_err(|e| {
        SocialError::Other(format!(
            "Failed to open seed database {}: {e}",
            config.seed_database_path
        ))
    })?;
    let conn = db.get_connection()?;

    let organisation = repository::get_or_create_organisation(&conn, &config.organisation_name)?;
    info!(
        organisation = %organisation.name,
        organisation_id = organisation.id,
        "Importing seed data"
    );

    let mut summary = ImportSummary::default();

    // One bot per seed character.
    let characters = load_characters(&seed)?;
    let mut imported = Vec::with_capacity(characters.len());

    for character in &characters {
        let bot_username = normalize_username(&character.username);

        let bot = match repository::get_bot_by_username(&conn, &bot_username)? {
            Some(existing) => existing,
            None => {
                summary.bots_created += 1;
                repository::create_bot(
                    &conn,
                    &NewBot {
                        owner_id: organisation.id,
                        username: bot_username.clone(),
                        nickname: character
                            .nickname
                            .clone()
                            .unwrap_or_else(|| character.username.clone()),
                        image: character.image.clone(),
                        background_color: Some(config.default_background_color.clone()),
                    },
                )?
            },
        };

        imported.push(ImportedBot {
            seed_id: character.id,
            bot_id: bot.id,
            bot_username,
            seed_username: character.username.clone(),
        });
    }

    // One post per seed post, with names rewritten and tokens parsed.
    let token_re = Regex::new(r"[@#]\w+").map_err(|e| SocialError::Other(e.to_string()))?;

    let mut stmt = seed.prepare("SELECT id, owner_id, content FROM posts ORDER BY id")?;
    let seed_posts = stmt.query_map(params![], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    for seed_post in seed_posts {
        let (seed_id, seed_owner_id, content) = seed_post?;

        let Some(owner) = imported.iter().find(|b| b.seed_id == seed_owner_id) else {
            debug!(seed_post_id = seed_id, "Skipping post with unknown owner");
            summary.posts_skipped += 1;
            continue;
        };

        let content = rewrite_mentions(&InputValidator::sanitize_text(&content), &imported);
        let post = repository::create_post(&conn, owner.bot_id, &content)?;

        for token in token_re.find_iter(&content) {
            if !standalone_at(&content, token.start()) {
                continue;
            }

            let word = &token.as_str()[1..];
            if token.as_str().starts_with('#') {
                let tag = repository::get_or_create_tag(&conn, &word.to_lowercase())?;
                relations::create_tag_map(&conn, post.id, tag.id)?;
                summary.tags_linked += 1;
            } else {
                match repository::get_bot_by_username(&conn, word)? {
                    Some(bot) => {
                        relations::create_mention(&conn, post.id, bot.id)?;
                        summary.mentions_linked += 1;
                    },
                    None => {
                        debug!(mention = word, post_id = post.id, "Skipping unknown mention");
                    },
                }
            }
        }

        summary.posts_imported += 1;
    }

    if summary.posts_skipped > 0 {
        warn!(skipped = summary.posts_skipped, "Some seed posts had no matching owner");
    }

    info!(
        bots = summary.bots_created,
        posts = summary.posts_imported,
        tags = summary.tags_linked,
        mentions = summary.mentions_linked,
        "Seed import complete"
    );
    timer.finish();
    metrics_timer.finish(true);

    Ok(summary)
}

fn load_characters(seed: &Connection) -> Result<Vec<SeedCharacter>> {
    let mut stmt =
        seed.prepare("SELECT id, username, nickname, image FROM characters ORDER BY id")?;

    let rows = stmt.query_map(params![], |row| {
        Ok(SeedCharacter {
            id: row.get(0)?,
            username: row.get(1)?,
            nickname: row.get(2)?,
            image: row.get(3)?,
        })
    })?;

    let mut characters = Vec::new();
    for character in rows {
        characters.push(character?);
    }

    Ok(characters)
}

/// Lowercase a character name into a bot username: spaces become
/// underscores, dots and apostrophes are dropped.
fn normalize_username(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "_")
        .replace(['.', '\''], "")
}

/// Rewrite standalone occurrences of seed character usernames into
/// `@bot_username` mentions.
fn rewrite_mentions(content: &str, bots: &[ImportedBot]) -> String {
    let mut result = content.to_string();

    for bot in bots {
        let Ok(re) = Regex::new(&regex::escape(&bot.seed_username)) else {
            continue;
        };

        let mut rewritten = String::with_capacity(result.len());
        let mut last_end = 0;

        for m in re.find_iter(&result) {
            let standalone = standalone_at(&result, m.start())
                && !result[m.end()..].starts_with(|c: char| c.is_alphanumeric() || c == '_');

            rewritten.push_str(&result[last_end..m.start()]);
            if standalone {
                rewritten.push('@');
                rewritten.push_str(&bot.bot_username);
            } else {
                rewritten.push_str(m.as_str());
            }
            last_end = m.end();
        }
        rewritten.push_str(&result[last_end..]);

        result = rewritten;
    }

    result
}

/// Whether the text at `start` begins a standalone token: at the start of
/// the content, or not glued to a preceding letter or `@`/`#` sigil.
fn standalone_at(content: &str, start: usize) -> bool {
    content[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphabetic() && c != '@' && c != '#')
}
