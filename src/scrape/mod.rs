//! Scrape orchestration
//!
//! The engine ties the components together: validate and compile the
//! request, build the per-invocation transport, gate on the robots policy,
//! drive the single-page or paginated path, then run the fixed
//! truncate → enrich → reindex pipeline over the aggregated records.

mod enrich;
mod paginate;

pub use enrich::ENRICH_CONCURRENCY;

use crate::config::{self, ScrapeRequest, SelectorKind};
use crate::extract::{self, Record, Selectors};
use crate::robots::PolicyCache;
use crate::transport::Transport;
use crate::{PluckError, Result};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// The outcome of one scrape invocation, immutable after return
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    /// The originally requested URL
    pub url: String,

    /// The selector that was matched
    pub selector: String,

    /// The selector dialect used
    pub selector_kind: SelectorKind,

    /// Extracted records in final aggregated order
    pub records: Vec<Record>,

    /// Wall-clock duration of the whole invocation, in milliseconds
    pub elapsed_ms: u64,
}

/// Pipeline stage reported in progress events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// A page was fetched and its records extracted
    Page,
    /// The invocation finished
    Done,
}

/// A progress notification, emitted at least once per completed page and
/// once on completion
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub items_so_far: usize,
    pub current_url: String,
}

/// Receiver for progress events
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Runtime context for one scrape call: cancellation plus optional progress
pub struct ScrapeContext<'a> {
    pub cancel: &'a CancellationToken,
    pub observer: Option<&'a dyn ProgressObserver>,
}

impl<'a> ScrapeContext<'a> {
    /// Context with cancellation only
    pub fn new(cancel: &'a CancellationToken) -> Self {
        Self {
            cancel,
            observer: None,
        }
    }

    /// Attaches a progress observer
    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub(crate) fn notify(&self, stage: Stage, items_so_far: usize, current_url: &str) {
        if let Some(observer) = self.observer {
            observer.on_progress(ProgressEvent {
                stage,
                items_so_far,
                current_url: current_url.to_string(),
            });
        }
    }

    pub(crate) fn check_canceled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PluckError::Canceled);
        }
        Ok(())
    }
}

/// The extraction engine
///
/// Owns the policy cache, which lives for the engine's lifetime so
/// overlapping invocations share per-origin permission decisions. The HTTP
/// client itself is built fresh per invocation.
#[derive(Default)]
pub struct Engine {
    policy: PolicyCache,
}

impl Engine {
    /// Creates an engine with an empty policy cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one scrape invocation
    ///
    /// Control flow: validate → compile selectors → build transport →
    /// robots gate → fetch/extract (single page or paginated) →
    /// truncate → enrich → reindex.
    ///
    /// # Errors
    ///
    /// * `PluckError::Configuration` - invalid request, before any network access
    /// * `PluckError::PolicyDenied` - robots.txt disallows the target
    /// * `PluckError::HttpStatus` / `Http` / `Timeout` - a page-level fetch failed
    /// * `PluckError::Canceled` - the cancellation signal fired at a checkpoint
    pub async fn scrape(
        &self,
        request: &ScrapeRequest,
        ctx: &ScrapeContext<'_>,
    ) -> Result<ScrapeResult> {
        let start = Instant::now();

        config::validate(request)?;
        let selectors = Selectors::compile(request)?;
        let transport = Transport::for_request(request)?;

        if request.respect_robots
            && !self
                .policy
                .is_allowed(&transport, &request.url, transport.identity())
                .await
        {
            return Err(PluckError::PolicyDenied {
                url: request.url.clone(),
            });
        }

        let mut records = if request.is_paginated() {
            paginate::run(&transport, request, &selectors, ctx).await?
        } else {
            single_page(&transport, request, &selectors, ctx).await?
        };

        // Fixed ordering: truncate, then enrich, then reindex
        if let Some(cap) = request.max_items {
            records.truncate(cap);
        }
        if let Some(image_selector) = selectors.detail_image.as_ref() {
            enrich::run(
                &transport,
                &mut records,
                image_selector,
                &request.detail_image_attribute,
                ctx,
            )
            .await?;
        }
        reindex(&mut records);

        ctx.notify(Stage::Done, records.len(), &request.url);

        Ok(ScrapeResult {
            url: request.url.clone(),
            selector: request.selector.clone(),
            selector_kind: request.selector_kind,
            records,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// The single-page shortcut: one fetch, one extraction
async fn single_page(
    transport: &Transport,
    request: &ScrapeRequest,
    selectors: &Selectors,
    ctx: &ScrapeContext<'_>,
) -> Result<Vec<Record>> {
    ctx.check_canceled()?;

    let body = transport.get_text(&request.url).await?;
    let base = Url::parse(&request.url)?;
    let extraction = extract::extract_page(
        &base,
        &body,
        selectors,
        request.attribute.as_deref(),
        &request.detail_url_attribute,
    );

    ctx.notify(Stage::Page, extraction.records.len(), &request.url);
    Ok(extraction.records)
}

/// Reassigns dense, zero-based indices in final order
fn reindex(records: &mut [Record]) {
    for (index, record) in records.iter_mut().enumerate() {
        record.index = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize) -> Record {
        Record {
            index,
            tag: "div".to_string(),
            text: String::new(),
            href: None,
            attribute_value: None,
            image_url: None,
            detail_url: None,
            html: String::new(),
        }
    }

    #[test]
    fn test_reindex_dense_zero_based() {
        let mut records = vec![record(4), record(9), record(2)];
        reindex(&mut records);
        let indices: Vec<usize> = records.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_bad_selector_fails_before_network() {
        let engine = Engine::new();
        // Port 9 is discard; if the engine tried the network this would hang
        // or error differently, but compilation must fail first.
        let mut request = ScrapeRequest::new("http://127.0.0.1:9/", "[[[");
        request.respect_robots = false;
        let cancel = CancellationToken::new();
        let ctx = ScrapeContext::new(&cancel);
        let err = engine.scrape(&request, &ctx).await.unwrap_err();
        assert!(matches!(err, PluckError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_missing_url_fails_before_network() {
        let engine = Engine::new();
        let request = ScrapeRequest::new("", "div");
        let cancel = CancellationToken::new();
        let ctx = ScrapeContext::new(&cancel);
        let err = engine.scrape(&request, &ctx).await.unwrap_err();
        assert!(matches!(err, PluckError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_pre_canceled_single_page() {
        let engine = Engine::new();
        let mut request = ScrapeRequest::new("http://127.0.0.1:9/", "div");
        request.respect_robots = false;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = ScrapeContext::new(&cancel);
        let err = engine.scrape(&request, &ctx).await.unwrap_err();
        assert!(err.is_canceled());
    }
}
