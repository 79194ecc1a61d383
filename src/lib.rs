//! listing-crawl: a queue-driven crawler for real-estate listing portals
//!
//! This crate seeds one search per (portal, neighborhood) pair, paginates each
//! search until it runs out of results, and extracts listing records from the
//! rendered result pages using per-field fallback strategy chains.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod model;
pub mod output;
pub mod portal;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Renderer error: {0}")]
    Render(#[from] crawler::RenderError),

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

    #[error("Unsupported portal: {0}")]
    UnsupportedPortal(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),

    #[error("Unsupported portal: {0}")]
    UnsupportedPortal(String),
}

impl From<UrlError> for ConfigError {
    fn from(err: UrlError) -> Self {
        match err {
            UrlError::UnsupportedPortal(portal) => ConfigError::UnsupportedPortal(portal),
            other => ConfigError::InvalidUrl(other.to_string()),
        }
    }
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{
    CrawlRequest, FailureKind, FailureRecord, ListingRecord, Portal, SearchFilters, SearchOrigin,
    TransactionType,
};
pub use url::{build_search_url, normalize_url, resolve_detail_url, slugify};
