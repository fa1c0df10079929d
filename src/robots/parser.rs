//! Robots.txt ruleset evaluation
//!
//! A thin wrapper over the robotstxt crate that keeps the raw file content
//! and matches lazily, with an explicit allow-all fallback used whenever the
//! file could not be fetched or is absent.

use robotstxt::DefaultMatcher;

/// Parsed crawl-permission ruleset for one origin
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Raw robots.txt content (empty means allow everything)
    content: String,
}

impl RobotsPolicy {
    /// Creates a policy from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Creates the permissive policy used when robots.txt is unavailable
    ///
    /// Policy absence must never be mistaken for prohibition, so fetch and
    /// parse failures resolve to this.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
        }
    }

    /// Checks whether a URL may be fetched under the given identity
    pub fn is_allowed(&self, url: &str, identity: &str) -> bool {
        if self.content.is_empty() {
            return true;
        }
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, identity, url)
    }
}
