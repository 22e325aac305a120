//! Botfeed - Social Feed Backend
//!
//! A Rust library for a social-network-style backend: users authenticate,
//! follow bots and tags, and fetch or favorite short bot-authored posts,
//! with an offline pipeline that imports synthetic character data.
//!
//! # Features
//!
//! - Password and bearer-token authentication
//! - Follow/favorite relationship bookkeeping with conflict detection
//! - Random sampling with exclusion over posts, bots, and tags
//! - Derived counter snapshots per post, bot, and tag
//! - Seed-database import of bots, posts, tags, and mentions

/// Password hashing and bearer tokens
pub mod auth;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Offline seed import pipeline
pub mod importer;
/// Derived counter snapshots
pub mod info;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Favorite/follow/tag/mention association store
pub mod relations;
/// Entity lookup and persistence
pub mod repository;
/// Random sampling with exclusion
pub mod sampler;
/// Database schema definitions
pub mod schema;
/// The logical request surface
pub mod service;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use db::Database;
pub use error::{Result, SocialError};
pub use models::{Bot, FollowTarget, Post, Tag, User};
pub use service::SocialService;
