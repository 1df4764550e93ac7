//! Tour-Sync: external tour catalog synchronization
//!
//! This crate crawls a paginated HTML tour catalog, extracts tours and their
//! schedules from loosely formatted markup, and reconciles the result against
//! a persisted event store (create unseen, update known, archive vanished).

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod robots;
pub mod storage;
pub mod sync;

use thiserror::Error;

/// Main error type for Tour-Sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: sync::SyncPhase,
        to: sync::SyncPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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
}

/// Page fetch errors
///
/// Both variants carry the URL so callers can report which page failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Transport failure for {url}: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    /// Returns the URL the failed request was made against
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. } | Self::Transport { url, .. } => url,
        }
    }

    /// Returns the HTTP status code, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }
}

/// Item page extraction errors
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("No title found on {url}")]
    MissingTitle { url: String },

    #[error("Cannot derive a slug from {url}")]
    MissingSlug { url: String },
}

/// Result type alias for Tour-Sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use extract::{CatalogItem, ScheduleRange, TourCategory};
pub use sync::{derive_key, SyncEngine, SyncReport};
