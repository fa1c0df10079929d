use std::str::FromStr;
use std::time::Duration;

/// Default attribute read from a detail-URL selector match
pub const DEFAULT_DETAIL_URL_ATTRIBUTE: &str = "href";

/// Default attribute read from a detail-image selector match
pub const DEFAULT_DETAIL_IMAGE_ATTRIBUTE: &str = "src";

/// The selector dialect used to match elements
///
/// Only CSS selectors are supported. The variants exist so that an
/// unsupported dialect (e.g. XPath) is rejected as a configuration error
/// before any network access, rather than producing confusing matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    Css,
}

impl SelectorKind {
    /// Returns the canonical name for this selector kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Css => "css",
        }
    }
}

impl FromStr for SelectorKind {
    type Err = String;

    /// Parses a selector kind from user input
    ///
    /// Accepts the aliases `css`, `selector`, and `query` (case-insensitive).
    /// `xpath` gets a dedicated message since it is the most common request.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "css" | "selector" | "query" => Ok(Self::Css),
            "xpath" => Err("XPath is not supported; use CSS selectors".to_string()),
            other => Err(format!("Unknown selector kind '{}'; use 'css'", other)),
        }
    }
}

impl std::fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All inputs for one scrape invocation
///
/// A request describes what to fetch and extract; runtime concerns
/// (cancellation, progress reporting) are passed separately to the engine.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    /// The page to scrape
    pub url: String,

    /// Selector dialect (only CSS is recognized)
    pub selector_kind: SelectorKind,

    /// Selector matching the target elements
    pub selector: String,

    /// Optional attribute to extract from each matched element
    pub attribute: Option<String>,

    /// Explicit client-identity string; overrides generation when set
    pub identity: Option<String>,

    /// Bias generated identities toward mobile profiles
    pub prefer_mobile: bool,

    /// Cap on the total number of records returned
    pub max_items: Option<usize>,

    /// Cap on the number of pages visited during pagination
    pub max_pages: Option<usize>,

    /// Selector locating the "next page" link
    pub next_selector: Option<String>,

    /// Selector locating the detail-page link inside a matched element
    pub detail_url_selector: Option<String>,

    /// Attribute read from the detail-URL match (defaults to `href`)
    pub detail_url_attribute: String,

    /// Selector locating the full image on a detail page; enables enrichment
    pub detail_image_selector: Option<String>,

    /// Attribute read from the detail-image match (defaults to `src`)
    pub detail_image_attribute: String,

    /// Disable retries and shorten backoff, trading resilience for speed
    pub fast_mode: bool,

    /// Check robots.txt policy before fetching any content
    pub respect_robots: bool,

    /// Per-HTTP-call timeout override (defaults to 15 seconds)
    pub timeout: Option<Duration>,
}

impl ScrapeRequest {
    /// Creates a request with the given target and selector, all options
    /// at their defaults
    pub fn new(url: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            selector_kind: SelectorKind::Css,
            selector: selector.into(),
            attribute: None,
            identity: None,
            prefer_mobile: false,
            max_items: None,
            max_pages: None,
            next_selector: None,
            detail_url_selector: None,
            detail_url_attribute: DEFAULT_DETAIL_URL_ATTRIBUTE.to_string(),
            detail_image_selector: None,
            detail_image_attribute: DEFAULT_DETAIL_IMAGE_ATTRIBUTE.to_string(),
            fast_mode: false,
            respect_robots: true,
            timeout: None,
        }
    }

    /// Returns true if this request drives the paginated path
    ///
    /// Mirrors the UI behavior: either a next-page selector or an explicit
    /// page cap selects pagination; otherwise the single-page shortcut runs.
    pub fn is_paginated(&self) -> bool {
        self.next_selector.is_some() || self.max_pages.is_some()
    }

    /// Returns true if detail-page enrichment is requested
    pub fn wants_enrichment(&self) -> bool {
        self.detail_image_selector.is_some()
    }
}
