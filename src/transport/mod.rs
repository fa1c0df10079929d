//! HTTP transport
//!
//! One reusable, pooled client per scrape invocation carries every fetch in
//! that invocation: the initial page, each paginated page, and each detail
//! page. Centralizing the client maximizes connection reuse during the
//! concurrent enrichment phase.
//!
//! Retry policy: idempotent methods only (GET/HEAD/OPTIONS), a small fixed
//! attempt count with exponential backoff, and only on 429/500/502/503/504
//! responses. Fast mode disables retries entirely.

use crate::config::ScrapeRequest;
use crate::identity;
use crate::{PluckError, Result};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, USER_AGENT,
};
use reqwest::{Client, Method, Response, StatusCode};
use std::time::Duration;

/// Default per-call timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Retry attempts after the initial request (ignored in fast mode)
const DEFAULT_RETRIES: u32 = 2;

/// Base backoff delay between retry attempts
const BACKOFF_BASE: Duration = Duration::from_millis(300);

/// Base backoff delay in fast mode (retries are off; kept for symmetry with
/// the shortened-backoff contract should a caller re-enable them)
const BACKOFF_BASE_FAST: Duration = Duration::from_millis(150);

/// Idle connections kept per destination, sized for the enrichment fan-out
const POOL_MAX_IDLE_PER_HOST: usize = 50;

/// Response statuses that are worth retrying
const RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// A configured HTTP client bound to one client identity
pub struct Transport {
    client: Client,
    identity: String,
    retries: u32,
    backoff_base: Duration,
}

impl Transport {
    /// Builds the transport for one scrape invocation
    ///
    /// Resolves the client identity (explicit string wins, otherwise a
    /// generated signature), installs the standard header set with a mobile
    /// viewport hint when the identity is mobile, and sizes the connection
    /// pool for the concurrent enrichment phase.
    pub fn for_request(request: &ScrapeRequest) -> Result<Self> {
        let identity = identity::resolve(request.identity.as_deref(), request.prefer_mobile);
        let timeout = request.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let retries = if request.fast_mode { 0 } else { DEFAULT_RETRIES };
        let backoff_base = if request.fast_mode {
            BACKOFF_BASE_FAST
        } else {
            BACKOFF_BASE
        };

        let client = Client::builder()
            .default_headers(build_headers(&identity))
            .timeout(timeout)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(PluckError::Client)?;

        Ok(Self {
            client,
            identity,
            retries,
            backoff_base,
        })
    }

    /// Returns the identity string this transport sends with every request
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Fetches a URL and returns the response body as text
    ///
    /// # Errors
    ///
    /// * `PluckError::HttpStatus` - non-2xx status after retries are exhausted
    /// * `PluckError::Timeout` - the per-call timeout elapsed
    /// * `PluckError::Http` - connection or protocol failure
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.execute(Method::GET, url).await?;
        response.text().await.map_err(|source| PluckError::Http {
            url: url.to_string(),
            source,
        })
    }

    /// Fetches a URL and returns the raw body plus the declared content type
    pub async fn get_bytes(&self, url: &str) -> Result<(Vec<u8>, Option<String>)> {
        let response = self.execute(Method::GET, url).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|source| PluckError::Http {
                url: url.to_string(),
                source,
            })?;
        Ok((bytes.to_vec(), content_type))
    }

    /// Performs a request, retrying retryable statuses for idempotent methods
    async fn execute(&self, method: Method, url: &str) -> Result<Response> {
        let retries = if is_idempotent(&method) { self.retries } else { 0 };

        let mut attempt = 0;
        loop {
            let result = self.client.request(method.clone(), url).send().await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if is_retryable(status) && attempt < retries {
                        let delay = self.backoff_base * 2u32.pow(attempt);
                        tracing::debug!(
                            "HTTP {} for {}, retrying in {:?} (attempt {}/{})",
                            status.as_u16(),
                            url,
                            delay,
                            attempt + 1,
                            retries
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(PluckError::HttpStatus {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                Err(source) => {
                    if source.is_timeout() {
                        return Err(PluckError::Timeout {
                            url: url.to_string(),
                        });
                    }
                    return Err(PluckError::Http {
                        url: url.to_string(),
                        source,
                    });
                }
            }
        }
    }
}

/// Returns true for methods safe to retry automatically
fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Returns true for statuses the retry policy covers
fn is_retryable(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status.as_u16())
}

/// Builds the default header set for an identity
///
/// Mobile identities get a viewport hint on top of the standard set. An
/// identity that cannot be encoded as a header value falls back to the
/// static default signature.
fn build_headers(identity: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let user_agent = HeaderValue::from_str(identity)
        .unwrap_or_else(|_| HeaderValue::from_static(identity::DEFAULT_IDENTITY));
    headers.insert(USER_AGENT, user_agent);
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );

    if identity::is_mobile(identity) {
        headers.insert(
            HeaderName::from_static("viewport-width"),
            HeaderValue::from_static("360"),
        );
    }

    headers
}
