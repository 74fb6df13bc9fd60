//! Crawl Frontier: a polite, resumable web crawl frontier
//!
//! This crate decides which URLs to visit, in what order and how fast, and keeps
//! that state durably in SQLite so a crawl run can be resumed after a crash.
//! Page fetching and link extraction are pluggable collaborators.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for frontier operations
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("robots.txt unavailable for {domain}: {message}")]
    RobotsFetch { domain: String, message: String },

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Crawl worker failed: {0}")]
    Worker(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Unsupported URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("No public suffix match for host: {0}")]
    UnknownSuffix(String),
}

/// Page fetch failures; all of them are treated as transient and retried
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("HTTP status {0}")]
    Status(u16),
}

/// Result type alias for frontier operations
pub type Result<T> = std::result::Result<T, FrontierError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, CrawlConfig, CrawlType};
pub use crawler::{Frontier, RunReport, StopReason};
pub use state::{DomainState, EntryStatus};
pub use storage::{CrawlStore, QueueEntry, QueueStats, SqliteStore};
pub use crate::url::{normalize_url, registrable_domain};
