//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Retry logic for transient failures
//! - Error classification
//!
//! The engine only ever sees `Ok(Content)` or `Err(FetchError)`; every error is
//! turned into a failed result by the worker that made the call.

use crate::config::{FetchConfig, UserAgentConfig};
use crate::crawler::queue::Content;
use crate::url::CanonicalUrl;
use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// Maximum number of redirects the client follows on its own
const MAX_REDIRECTS: usize = 10;

/// Why a page could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("expected HTML, got {0}")]
    ContentType(String),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),

    /// The fetcher panicked; the worker survives and reports it as a failure
    #[error("fetcher panicked: {0}")]
    Panicked(String),
}

impl FetchError {
    /// Returns true if another attempt might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) => true,
            Self::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

/// Source of page content
///
/// Implementations apply their own timeout and retry policy. Any error they
/// return is treated as a failed fetch for that one address.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, address: &CanonicalUrl) -> Result<Content, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `fetch` - Timeouts for the client
///
/// # Example
///
/// ```no_run
/// use ripple_crawl::config::{FetchConfig, UserAgentConfig};
/// use ripple_crawl::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "RippleCrawl".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    fetch: &FetchConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(fetch.timeout())
        .connect_timeout(fetch.connect_timeout())
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by `reqwest`
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx with HTML body | Success |
/// | HTTP 4xx | Immediate failure |
/// | HTTP 5xx | Retry up to `max_retries` times |
/// | Timeout | Retry up to `max_retries` times |
/// | Connection refused | Retry up to `max_retries` times |
/// | Non-HTML Content-Type | Immediate failure |
/// | Undecodable body | Immediate failure |
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher from configuration
    pub fn new(user_agent: &UserAgentConfig, fetch: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, fetch)?;
        Ok(Self::with_client(client, fetch))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, fetch: &FetchConfig) -> Self {
        Self {
            client,
            max_retries: fetch.max_retries,
            retry_delay: fetch.retry_delay(),
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Content, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(ct) = &content_type {
            if !is_html(ct) {
                return Err(FetchError::ContentType(ct.clone()));
            }
        }

        let body = response.text().await?;

        Ok(Content { body, content_type })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, address: &CanonicalUrl) -> Result<Content, FetchError> {
        let mut attempt = 0;

        loop {
            match self.fetch_once(address.as_str()).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        "Fetch of {} failed ({}), retry {}/{}",
                        address,
                        e,
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Returns true for HTML and XHTML content types
fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}
