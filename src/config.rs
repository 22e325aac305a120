use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SocialError};

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub sampling: SamplingConfig,
    pub import: ImportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing bearer tokens
    pub token_secret: String,
    /// Token lifetime in seconds
    pub token_ttl_secs: u64,
    /// Minimum accepted password length
    pub min_password_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Entities returned by a random-sample call when no count is given
    pub default_count: i64,
    /// Upper bound on a single call's count
    pub max_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Path to the seed SQLite database of characters and generated posts
    pub seed_database_path: String,
    /// Organisation that owns the imported bots
    pub organisation_name: String,
    /// Background color assigned to imported bots
    pub default_background_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://data/botfeed.db".to_string(),
                max_connections: 10,
                connection_timeout_secs: 30,
            },
            auth: AuthConfig {
                token_secret: String::new(),
                token_ttl_secs: 60 * 60 * 24,
                min_password_len: 6,
            },
            sampling: SamplingConfig {
                default_count: 5,
                max_count: 100,
            },
            import: ImportConfig {
                seed_database_path: "data/seed.db".to_string(),
                organisation_name: "ComicVine".to_string(),
                default_background_color: "bg-navy-800".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// defaults, then `config/default` and `config/local` files if present,
    /// then `BOTFEED_`-prefixed environment variables.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let config = Config::builder()
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", defaults.database.max_connections)?
            .set_default(
                "database.connection_timeout_secs",
                defaults.database.connection_timeout_secs,
            )?
            .set_default("auth.token_secret", defaults.auth.token_secret)?
            .set_default("auth.token_ttl_secs", defaults.auth.token_ttl_secs)?
            .set_default("auth.min_password_len", defaults.auth.min_password_len as u64)?
            .set_default("sampling.default_count", defaults.sampling.default_count)?
            .set_default("sampling.max_count", defaults.sampling.max_count)?
            .set_default("import.seed_database_path", defaults.import.seed_database_path)?
            .set_default("import.organisation_name", defaults.import.organisation_name)?
            .set_default(
                "import.default_background_color",
                defaults.import.default_background_color,
            )?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("BOTFEED").separator("__"))
            .build()?;

        let app_config: Self = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(SocialError::InvalidConfig(
                "max_connections must be greater than 0".to_string(),
            ));
        }
        if self.database.connection_timeout_secs == 0 {
            return Err(SocialError::InvalidConfig(
                "connection_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(SocialError::InvalidConfig(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                self.logging.level
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(SocialError::InvalidConfig(format!(
                "Invalid log format: {}. Must be one of: {valid_formats:?}",
                self.logging.format
            )));
        }

        if self.auth.token_ttl_secs == 0 {
            return Err(SocialError::InvalidConfig(
                "token_ttl_secs must be greater than 0".to_string(),
            ));
        }
        if self.auth.min_password_len == 0 {
            return Err(SocialError::InvalidConfig(
                "min_password_len must be greater than 0".to_string(),
            ));
        }

        if self.sampling.default_count <= 0 {
            return Err(SocialError::InvalidConfig(
                "sampling.default_count must be greater than 0".to_string(),
            ));
        }
        if self.sampling.max_count < self.sampling.default_count {
            return Err(SocialError::InvalidConfig(
                "sampling.max_count must not be below sampling.default_count".to_string(),
            ));
        }

        if self.import.organisation_name.trim().is_empty() {
            return Err(SocialError::InvalidConfig(
                "import.organisation_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Get database URL from environment or config
    #[must_use]
    pub fn get_database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.url.clone())
    }

    /// Get the token secret from environment or config
    #[must_use]
    pub fn get_token_secret(&self) -> String {
        std::env::var("BOTFEED_TOKEN_SECRET").unwrap_or_else(|_| self.auth.token_secret.clone())
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.url, "sqlite://data/botfeed.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.sampling.default_count, 5);
        assert_eq!(config.auth.min_password_len, 6);
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_count_below_default_rejected() {
        let mut config = AppConfig::default();
        config.sampling.max_count = 1;
        assert!(config.validate().is_err());
    }
}
