//! Ripple-Crawl: a concurrent, depth-bounded breadth-first crawler
//!
//! This crate implements a crawl engine in which a pool of fetch workers feeds
//! a single coordinating traversal loop. The coordinator owns the visited set
//! and the outstanding-work counter, hands every fetched page to a
//! caller-supplied action, and yields `(address, result)` pairs as pages
//! finish.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for Ripple-Crawl operations
///
/// These errors are only ever returned before a crawl starts. Once a crawl is
/// running, per-page failures are reported as data.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
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

/// URL-specific errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Address contains whitespace: {0:?}")]
    Whitespace(String),

    #[error("Empty address")]
    Empty,
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Crawl, CrawlOptions, Crawler};
pub use url::{canonicalize, resolve, CanonicalUrl};
