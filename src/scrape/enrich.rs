//! Detail-page enrichment
//!
//! Back-fills `image_url` by visiting each record's detail page. Records
//! sharing a detail URL are grouped ahead of time so every distinct page is
//! fetched exactly once, through a bounded concurrent worker pool over the
//! shared pooled transport. Failure is local: one bad detail page leaves
//! its records untouched and never aborts the batch. Cancellation aborts
//! the whole enrichment.

use crate::extract::{self, Record};
use crate::scrape::ScrapeContext;
use crate::transport::Transport;
use crate::Result;
use futures::stream::{self, StreamExt};
use scraper::Selector;
use std::collections::HashMap;
use url::Url;

/// Width of the enrichment worker pool
pub const ENRICH_CONCURRENCY: usize = 8;

/// Enriches every record carrying a detail URL
///
/// On success for a URL, every record sharing it has `image_url`
/// overwritten with the enriched value; enrichment always wins over the
/// page-level heuristic guess.
pub async fn run(
    transport: &Transport,
    records: &mut [Record],
    image_selector: &Selector,
    image_attribute: &str,
    ctx: &ScrapeContext<'_>,
) -> Result<()> {
    ctx.check_canceled()?;

    // Distinct detail URL -> positions of the records sharing it. Index
    // slices are resolved up front so workers never coordinate over the map.
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (position, record) in records.iter().enumerate() {
        if let Some(url) = record.detail_url.as_deref().filter(|u| !u.is_empty()) {
            groups.entry(url.to_string()).or_default().push(position);
        }
    }
    if groups.is_empty() {
        return Ok(());
    }

    tracing::debug!(
        "enriching {} records from {} distinct detail pages",
        records.len(),
        groups.len()
    );

    let fetches = groups.keys().cloned().map(|url| async move {
        let image = fetch_detail_image(transport, &url, image_selector, image_attribute).await;
        (url, image)
    });
    let mut results = stream::iter(fetches).buffer_unordered(ENRICH_CONCURRENCY);

    while let Some((url, image)) = results.next().await {
        ctx.check_canceled()?;
        if let Some(image) = image {
            for &position in &groups[&url] {
                records[position].image_url = Some(image.clone());
            }
        }
    }

    Ok(())
}

/// Fetches one detail page and pulls the configured image attribute
///
/// Any failure (fetch error, selector miss, missing attribute) resolves to
/// `None`; the caller leaves the affected records unchanged.
async fn fetch_detail_image(
    transport: &Transport,
    url: &str,
    selector: &Selector,
    attribute: &str,
) -> Option<String> {
    let base = Url::parse(url).ok()?;
    match transport.get_text(url).await {
        Ok(body) => extract::select_first_attribute(&base, &body, selector, attribute),
        Err(e) => {
            tracing::debug!("detail fetch failed for {}: {}", url, e);
            None
        }
    }
}
