//! Pagination traversal
//!
//! Drives the transport and extractor across a chain of pages linked by a
//! "next page" selector. Strictly sequential: each page's URL comes from
//! the previous page's markup. A per-run visited set guarantees no URL is
//! fetched twice, which also terminates self-referential next links.

use crate::config::ScrapeRequest;
use crate::extract::{self, Record, Selectors};
use crate::scrape::{ScrapeContext, Stage};
use crate::transport::Transport;
use crate::Result;
use std::collections::HashSet;
use url::Url;

/// Runs the pagination loop and returns the accumulated records
///
/// Stop conditions, in order, after each page: cancellation (error),
/// revisited URL (silent stop), page cap, item cap (with exact truncation),
/// no resolvable next link, next link equal to the current page.
pub async fn run(
    transport: &Transport,
    request: &ScrapeRequest,
    selectors: &Selectors,
    ctx: &ScrapeContext<'_>,
) -> Result<Vec<Record>> {
    let mut collected: Vec<Record> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = request.url.clone();
    let mut pages_visited = 0usize;

    loop {
        ctx.check_canceled()?;

        // Cycle guard: a URL seen earlier in this run stops traversal
        // silently, before any repeat fetch.
        if !visited.insert(current.clone()) {
            tracing::debug!("already visited {}, stopping pagination", current);
            break;
        }

        let body = transport.get_text(&current).await?;
        let base = Url::parse(&current)?;
        let extraction = extract::extract_page(
            &base,
            &body,
            selectors,
            request.attribute.as_deref(),
            &request.detail_url_attribute,
        );

        collected.extend(extraction.records);
        pages_visited += 1;
        ctx.notify(Stage::Page, collected.len(), &current);
        tracing::debug!(
            "page {} extracted, {} records so far ({})",
            pages_visited,
            collected.len(),
            current
        );

        if let Some(cap) = request.max_pages {
            if pages_visited >= cap {
                break;
            }
        }

        if let Some(cap) = request.max_items {
            if collected.len() >= cap {
                collected.truncate(cap);
                break;
            }
        }

        match extraction.next_url {
            None => break,
            // A next link pointing at the page it sits on would need a
            // second iteration for the visited set to catch; stop now.
            Some(next) if next == current => break,
            Some(next) => current = next,
        }
    }

    Ok(collected)
}
