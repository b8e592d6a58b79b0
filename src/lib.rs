//! Sumi-Mirror: a polite concurrent site mirror
//!
//! This crate crawls a website from a seed URL with a bounded pool of workers,
//! saves every fetched document under a local output root, and rewrites in-page
//! links so the mirror can be browsed offline. Crawling respects depth limits,
//! host allow-lists, robots.txt and a per-worker request delay.

pub mod config;
pub mod crawler;
pub mod mirror;
pub mod output;
pub mod robots;
pub mod scan;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Mirror operations
#[derive(Debug, Error)]
pub enum SumiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error(transparent)]
    PathEscape(#[from] mirror::PathEscape),

    #[error("Scan error: {0}")]
    Scan(#[from] scan::ScanError),

    #[error("Invalid crawl phase transition: {from:?} -> {to:?}")]
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

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Sumi-Mirror operations
pub type Result<T> = std::result::Result<T, SumiError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, CancelHandle, Coordinator};
pub use mirror::{map_url, MappedPath, PathEscape};
pub use output::CrawlSummary;
pub use state::{CrawlPhase, PageOutcome};
pub use crate::url::{normalize_url, resolve, ScopePolicy};
