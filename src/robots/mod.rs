//! Crawl-permission policy cache
//!
//! Caches per-origin robots.txt rulesets for the lifetime of the engine so
//! repeated checks against the same origin never refetch the file. Entries
//! are never invalidated; a restart refreshes policy. That staleness is a
//! deliberate tradeoff to keep the cache a single mutex-guarded map.

mod parser;

pub use parser::RobotsPolicy;

use crate::transport::Transport;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// Per-origin cache of parsed crawl-permission rulesets
///
/// Safe for concurrent use: the map is guarded by an exclusive lock, and the
/// robots.txt fetch happens outside the lock. Two callers racing on a cold
/// origin may both fetch; the last insert wins, which is harmless because
/// both parsed the same file.
#[derive(Default)]
pub struct PolicyCache {
    entries: Mutex<HashMap<String, RobotsPolicy>>,
}

impl PolicyCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks whether `url` may be fetched under `identity`
    ///
    /// Derives the origin, consults the cache, and on a miss fetches
    /// `{origin}/robots.txt` through the shared transport. Every failure
    /// along the way (bad URL, network error, non-2xx) fails open: the
    /// origin is cached as allow-all and `true` is returned.
    pub async fn is_allowed(&self, transport: &Transport, url: &str, identity: &str) -> bool {
        let origin = match origin_of(url) {
            Some(origin) => origin,
            // Unparsable URL: nothing to key the policy on, fail open
            None => return true,
        };

        if let Some(policy) = self.entries.lock().unwrap().get(&origin) {
            return policy.is_allowed(url, identity);
        }

        let robots_url = format!("{}/robots.txt", origin);
        let policy = match transport.get_text(&robots_url).await {
            Ok(body) => RobotsPolicy::from_content(&body),
            Err(e) => {
                tracing::debug!("robots.txt unavailable for {}: {}; failing open", origin, e);
                RobotsPolicy::allow_all()
            }
        };

        let allowed = policy.is_allowed(url, identity);
        self.entries.lock().unwrap().insert(origin, policy);
        allowed
    }

    /// Number of origins currently cached
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Returns true if no origin has been checked yet
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

/// Derives the origin (scheme + host + non-default port) from a URL
fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return None;
    }
    Some(origin.ascii_serialization())
}
