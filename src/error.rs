//! Error types for the botfeed library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the application.

use thiserror::Error;

/// Errors that can occur in the botfeed application.
///
/// The first four variants form the client-visible taxonomy: every service
/// operation surfaces failures as one of them, raised at the point of
/// detection with no retry.
#[derive(Error, Debug)]
pub enum SocialError {
    /// Malformed input, rejected before any storage access
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A uniqueness or existence rule failed
    #[error("{0}")]
    Conflict(String),

    /// Referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Missing/invalid/expired token or wrong password
    #[error("{0}")]
    Unauthorized(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Password hashing errors
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// Token encoding/decoding errors
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with SocialError
pub type Result<T> = std::result::Result<T, SocialError>;

impl From<anyhow::Error> for SocialError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for SocialError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::PasswordHash(err.to_string())
    }
}

impl From<config::ConfigError> for SocialError {
    fn from(err: config::ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
