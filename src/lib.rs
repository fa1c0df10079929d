//! Webpluck: a selector-driven web extraction engine
//!
//! This crate extracts structured records from HTML pages using CSS selectors,
//! optionally following pagination links and enriching records from detail
//! pages, while respecting robots.txt and rotating client identities.

pub mod config;
pub mod export;
pub mod extract;
pub mod identity;
pub mod presets;
pub mod robots;
pub mod scrape;
pub mod transport;

use thiserror::Error;

/// Main error type for webpluck operations
#[derive(Debug, Error)]
pub enum PluckError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Scraping disallowed by robots.txt for {url}")]
    PolicyDenied { url: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request failed for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Operation canceled")]
    Canceled,

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl PluckError {
    /// Returns true if this error is the cooperative-cancellation condition
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Result type alias for webpluck operations
pub type Result<T> = std::result::Result<T, PluckError>;

// Re-export commonly used types
pub use config::{ScrapeRequest, SelectorKind};
pub use extract::Record;
pub use scrape::{Engine, ProgressEvent, ProgressObserver, ScrapeResult, Stage};
pub use transport::Transport;
