//! Sluice: a sequential forum crawler and downloader
//!
//! This crate walks a paginated forum index from the highest page number down
//! to the lowest, filters posts by title keywords, resolves each post to an
//! intermediary redirect page, and completes the file download there through
//! a real browser.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use std::time::Duration;
use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Page {url} was redirected to a login/error wall ({signal})")]
    PageBlocked {
        url: String,
        signal: crawler::BlockSignal,
    },

    #[error("Timed out after {after:?} waiting for {what} on {url}")]
    Timeout {
        what: String,
        url: String,
        after: Duration,
    },

    #[error("No redirect link found on {url}")]
    LinkNotFound { url: String },

    #[error("List page {url} answered with status {}", display_status(.status))]
    HttpStatus { url: String, status: Option<u16> },

    #[error("Browser error: {0}")]
    Browser(BrowserError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// Returns true if a fresh attempt at the same post may succeed.
    ///
    /// Everything the page or the engine can throw at a single post is
    /// recoverable at entry level. Local configuration and filesystem
    /// failures are not. The post processor logs those at error level but
    /// still spends the retry budget on them and never aborts the crawl.
    pub fn is_entry_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::Io(_))
    }
}

impl From<BrowserError> for CrawlError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Timeout { what, url, after } => Self::Timeout { what, url, after },
            other => Self::Browser(other),
        }
    }
}

fn display_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

/// Errors raised by a browser engine implementation
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Timed out after {after:?} waiting for {what} on {url}")]
    Timeout {
        what: String,
        url: String,
        after: Duration,
    },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("No element matches {0}")]
    ElementNotFound(String),

    #[error("Browser protocol error: {0}")]
    Protocol(String),

    #[error("Download from {url} was canceled")]
    DownloadCanceled { url: String },

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

    #[error("Invalid selector or pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for browser engine operations
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, PostEntry};
pub use state::{CrawlState, EntryPhase};
