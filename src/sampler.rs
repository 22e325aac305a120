//! Random sampling without replacement over filterable populations.
//!
//! One routine serves posts, bots, and tags: the caller composes a
//! [`PopulationFilter`] out of predicate clauses, and [`sample`] handles the
//! exclusion bookkeeping, count clamping, and offset draws identically for
//! every entity kind.

use rand::Rng;
use rusqlite::{types::Value, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::Sampleable;

/// A population-defining predicate: zero or more SQL clauses ANDed together,
/// each with its bound parameters.
#[derive(Debug, Default)]
pub struct PopulationFilter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl PopulationFilter {
    /// The unfiltered population
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Add a raw predicate clause with its parameters
    pub fn clause(mut self, clause: impl Into<String>, params: impl IntoIterator<Item = Value>) -> Self {
        self.clauses.push(clause.into());
        self.params.extend(params);
        self
    }

    /// Restrict posts to those carrying a tag
    #[must_use]
    pub fn by_tag(self, tag_id: i64) -> Self {
        self.clause(
            "id IN (SELECT post_id FROM tagmap WHERE tag_id = ?)",
            [Value::Integer(tag_id)],
        )
    }

    /// Restrict posts to those owned by a bot
    #[must_use]
    pub fn by_bot(self, bot_id: i64) -> Self {
        self.clause("owner_id = ?", [Value::Integer(bot_id)])
    }

    /// Restrict posts to those owned by or mentioning a bot
    #[must_use]
    pub fn by_owner_or_mentioned(self, bot_id: i64) -> Self {
        self.clause(
            "(owner_id = ? OR id IN (SELECT post_id FROM mentionmap WHERE mention_id = ?))",
            [Value::Integer(bot_id), Value::Integer(bot_id)],
        )
    }

    /// Restrict posts to a user's favorites
    #[must_use]
    pub fn favorites_of(self, user_id: i64) -> Self {
        self.clause(
            "id IN (SELECT post_id FROM favoritemap WHERE user_id = ?)",
            [Value::Integer(user_id)],
        )
    }

    /// Restrict posts to those containing every whitespace-separated term
    #[must_use]
    pub fn content_contains_all(self, filter: &str) -> Self {
        let mut result = self;
        for term in filter.split_whitespace() {
            result = result.clause(
                "content LIKE ? ESCAPE '\\'",
                [Value::Text(format!("%{}%", like_escape(term)))],
            );
        }
        result
    }

    /// Restrict bots to those a user follows
    #[must_use]
    pub fn followed_bots_of(self, user_id: i64) -> Self {
        self.clause(
            "id IN (SELECT bot_id FROM followingmap WHERE follower_id = ? AND bot_id IS NOT NULL)",
            [Value::Integer(user_id)],
        )
    }

    /// Restrict tags to those a user follows
    #[must_use]
    pub fn followed_tags_of(self, user_id: i64) -> Self {
        self.clause(
            "id IN (SELECT tag_id FROM followingmap WHERE follower_id = ? AND tag_id IS NOT NULL)",
            [Value::Integer(user_id)],
        )
    }

    fn where_sql(&self, extra: Option<&str>) -> String {
        let mut parts: Vec<&str> = self.clauses.iter().map(String::as_str).collect();
        if let Some(extra) = extra {
            parts.push(extra);
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        }
    }
}

/// Count the population rows matching the filter, ignoring exclusions
pub fn population_count<T: Sampleable>(conn: &Connection, filter: &PopulationFilter) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}{}", T::TABLE, filter.where_sql(None));

    let count = conn.query_row(
        &sql,
        rusqlite::params_from_iter(filter.params.iter().cloned()),
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Draw `count` unique random entities from the filtered population.
///
/// Ids in `exclude` are never returned; each pick is appended to `exclude`
/// so the set grows across the call (and across calls reusing the same
/// vector). The count is clamped to the population remainder; exhausted
/// populations and non-positive counts yield an empty result. Draws are
/// deterministic for a fixed `rng` seed and fixed row order.
pub fn sample<T, R>(
    conn: &Connection,
    filter: &PopulationFilter,
    count: i64,
    exclude: &mut Vec<i64>,
    rng: &mut R,
) -> Result<Vec<T>>
where
    T: Sampleable,
    R: Rng + ?Sized,
{
    let mut picked = Vec::new();

    if count <= 0 {
        return Ok(picked);
    }

    let remaining = population_count::<T>(conn, filter)?;

    if exclude.len() as i64 >= remaining {
        return Ok(picked);
    }
    let count = count.min(remaining - exclude.len() as i64);

    for _ in 0..count {
        // The window shrinks as picks accumulate in the exclusion set.
        let window = remaining - exclude.len() as i64;
        let offset = rng.gen_range(0..window);

        let Some(entity) = row_at_offset::<T>(conn, filter, exclude, offset)? else {
            // Population shrank between the count and this fetch; return
            // what we have rather than guessing at the new shape.
            break;
        };

        exclude.push(entity.id());
        picked.push(entity);
    }

    metrics::counter!("botfeed_sampler_draws_total", "entity" => T::TABLE)
        .increment(picked.len() as u64);

    Ok(picked)
}

/// Fetch the population row at `offset` after filtering out excluded ids
fn row_at_offset<T: Sampleable>(
    conn: &Connection,
    filter: &PopulationFilter,
    exclude: &[i64],
    offset: i64,
) -> Result<Option<T>> {
    let exclusion = if exclude.is_empty() {
        None
    } else {
        let placeholders = vec!["?"; exclude.len()].join(", ");
        Some(format!("id NOT IN ({placeholders})"))
    };

    let sql = format!(
        "SELECT * FROM {}{} ORDER BY id LIMIT 1 OFFSET ?",
        T::TABLE,
        filter.where_sql(exclusion.as_deref()),
    );

    let params: Vec<Value> = filter
        .params
        .iter()
        .cloned()
        .chain(exclude.iter().map(|id| Value::Integer(*id)))
        .chain(std::iter::once(Value::Integer(offset)))
        .collect();

    let entity = conn
        .query_row(&sql, rusqlite::params_from_iter(params), |row| {
            T::from_row(row)
        })
        .optional()?;

    Ok(entity)
}

/// Escape LIKE wildcards in a user-supplied term
fn like_escape(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
