//! Crawler module for concurrent, depth-bounded traversal
//!
//! This module contains the core crawling logic, including:
//! - The frontier and result queues that connect the coordinator to workers
//! - HTTP fetching with retry logic
//! - HTML link discovery
//! - The traversal coordinator and its lazy result sequence

mod coordinator;
mod fetcher;
mod parser;
mod queue;
mod worker;

pub use coordinator::{Crawl, CrawlOptions, Crawler};
pub use fetcher::{build_http_client, FetchError, Fetcher, HttpFetcher};
pub use parser::{extract_hrefs, HtmlLinkDiscovery, LinkDiscovery};
pub use queue::{
    result_queue, Content, FetchOutcome, FrontierItem, FrontierMessage, FrontierQueue, ResultItem,
    ResultReceiver, ResultSender, WorkQueue,
};
pub use worker::spawn_workers;

use crate::config::{FetchConfig, UserAgentConfig, DEFAULT_WORKERS};
use crate::CrawlError;
use std::sync::Arc;

/// Crawls from `seed` with the default HTTP fetcher and HTML link discovery
///
/// This is the shortest way to run a crawl. It uses [`DEFAULT_WORKERS`]
/// workers, the default user agent and the default fetch policy. Build a
/// [`Crawler`] directly for anything else.
///
/// # Arguments
///
/// * `seed` - The address to start from
/// * `max_depth` - Maximum number of hops from the seed
/// * `action` - Applied to every successfully fetched page
///
/// # Returns
///
/// * `Ok(Crawl)` - A lazy crawl; nothing is fetched until it is polled
/// * `Err(CrawlError)` - The seed is not a valid address or the HTTP client
///   could not be built
pub fn crawl<F, R>(seed: &str, max_depth: u32, action: F) -> Result<Crawl<F>, CrawlError>
where
    F: FnMut(&Content) -> R,
{
    let fetcher = HttpFetcher::new(&UserAgentConfig::default(), &FetchConfig::default())?;
    let options = CrawlOptions {
        workers: DEFAULT_WORKERS,
        max_depth,
        strip_fragments: false,
    };
    let crawler = Crawler::new(options, Arc::new(fetcher), Arc::new(HtmlLinkDiscovery))?;
    crawler.crawl(seed, action)
}
