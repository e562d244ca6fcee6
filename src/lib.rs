//! Linkscan: a scoped link-graph crawler
//!
//! This crate implements a distributed web crawler that discovers, deduplicates,
//! and tracks pages within a bounded host/path scope, recording the link graph
//! (pages, backlinks, redirect chains) for later analysis. Workers coordinate
//! exclusively through durable work queues and a shared link-graph store.

pub mod config;
pub mod crawler;
pub mod export;
pub mod queue;
pub mod scope;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for linkscan operations
#[derive(Debug, Error)]
pub enum LinkscanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] queue::QueueError),

    #[error("Scope pattern error: {0}")]
    Scope(#[from] scope::ScopeError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Payload encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scan not found: {0}")]
    ScanNotFound(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern in config: {0}")]
    InvalidPattern(String),
}

/// Result type alias for linkscan operations
pub type Result<T> = std::result::Result<T, LinkscanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use scope::{ScanScope, ScopePolicy};
pub use storage::{SqliteStore, UrlRecord, UrlState};
pub use url::{resolve, root_stem, url_hash, Skip};
