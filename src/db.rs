use std::fs;
use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::schema::{bots, favoritemap, followingmap, posts, tags, users};

/// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
/// Type alias for a pooled connection
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager for handling connections and migrations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection pool and run migrations
    pub fn new(database_url: &str) -> Result<Self> {
        Self::with_max_connections(database_url, 10)
    }

    /// Create a pool with an explicit size limit
    pub fn with_max_connections(database_url: &str, max_connections: u32) -> Result<Self> {
        let file_path = database_file_path(database_url);

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(file_path);
        let pool = Pool::builder().max_size(max_connections).build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;

        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!(
            "../migrations/2026-07-02-000000_create_tables/up.sql"
        ))?;

        conn.execute_batch(include_str!(
            "../migrations/2026-07-02-000001_add_indexes/up.sql"
        ))?;

        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Row counts across the main tables, for the stats command
    pub fn store_stats(&self) -> Result<StoreStats> {
        let conn = self.get_connection()?;

        let count = |table: &str| -> Result<i64> {
            Ok(conn.query_row(
                &format!("SELECT COUNT(*) FROM {table}"),
                params![],
                |row| row.get(0),
            )?)
        };

        Ok(StoreStats {
            users: count(users::TABLE)?,
            bots: count(bots::TABLE)?,
            posts: count(posts::TABLE)?,
            tags: count(tags::TABLE)?,
            favorites: count(favoritemap::TABLE)?,
            follows: count(followingmap::TABLE)?,
        })
    }
}

/// Row counts across the main tables
#[derive(Debug)]
pub struct StoreStats {
    pub users: i64,
    pub bots: i64,
    pub posts: i64,
    pub tags: i64,
    pub favorites: i64,
    pub follows: i64,
}

/// Strip the `sqlite:`/`sqlite://` URL scheme down to a file path
fn database_file_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

/// Initialize the database connection from configuration
pub fn establish_connection(config: &DatabaseConfig) -> Result<Database> {
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| config.url.clone());

    let database = Database::with_max_connections(&database_url, config.max_connections)?;
    info!(url = %database_url, "Database ready");

    Ok(database)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_file_path_strips_scheme() {
        assert_eq!(database_file_path("sqlite://data/a.db"), "data/a.db");
        assert_eq!(database_file_path("sqlite:data/a.db"), "data/a.db");
        assert_eq!(database_file_path("data/a.db"), "data/a.db");
    }
}
