//! tnt-crawler: a bounded, cancellable crawler for paginated release listings
//!
//! This crate fetches the first page of a form-driven search endpoint,
//! discovers how many pages the listing has, then fetches the remaining pages
//! concurrently under a worker cap, decoding each page's results table into
//! [`Entry`] records that are pushed to an [`EntrySink`] as they arrive.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for tnt-crawler operations
#[derive(Debug, Error)]
pub enum TntError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for page {page}: {source}")]
    Http { page: u32, source: reqwest::Error },

    #[error("HTTP status {status} for page {page}")]
    HttpStatus { page: u32, status: u16 },

    #[error("HTTP client error: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
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

    #[error("you must specify a valid keyword")]
    MissingKeyword,

    #[error("you must specify a valid category")]
    MissingCategory,

    #[error("crawler has not been set up with a keyword and category")]
    NotConfigured,
}

/// Result type alias for tnt-crawler operations
pub type Result<T> = std::result::Result<T, TntError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOutcome, CrawlReport, CrawlRequest, Entry, StopHandle, TntCrawler};
pub use output::{EntrySink, SinkEvent};
pub use state::CrawlPhase;
