//! Traversal coordinator - main crawl orchestration logic
//!
//! The coordinator is the single owner of traversal state. It seeds the
//! frontier, drains fetched pages from the result queue, runs the caller's
//! action, expands links, and detects completion with an outstanding-work
//! counter:
//!
//! ```text
//! outstanding = frontier items created - result items consumed
//! ```
//!
//! The crawl is finished when the counter drops to zero, at which point one
//! shutdown sentinel per worker is placed on the frontier.
//!
//! Workers never touch the visited set or the counter. Keeping every mutation
//! on this side of the queues is what keeps the traversal free of races.

use crate::config::{validate_workers, Config, DEFAULT_WORKERS};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::parser::{HtmlLinkDiscovery, LinkDiscovery};
use crate::crawler::queue::{
    result_queue, Content, FetchOutcome, FrontierItem, FrontierMessage, FrontierQueue,
    ResultReceiver, ResultSender,
};
use crate::crawler::worker::spawn_workers;
use crate::output::CrawlStats;
use crate::url::{CanonicalUrl, Canonicalizer};
use crate::{ConfigError, CrawlError};
use futures::stream::{self, Stream};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Tunables for a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Number of concurrent fetch workers
    pub workers: usize,

    /// Maximum number of hops from the seed (0 fetches only the seed)
    pub max_depth: u32,

    /// Treat addresses that differ only by fragment as the same page
    pub strip_fragments: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_depth: 1,
            strip_fragments: false,
        }
    }
}

impl From<&Config> for CrawlOptions {
    fn from(config: &Config) -> Self {
        Self {
            workers: config.crawler.workers,
            max_depth: config.crawler.max_depth,
            strip_fragments: config.crawler.strip_fragments,
        }
    }
}

/// A configured crawl engine
///
/// A `Crawler` holds the collaborators and options; each call to
/// [`Crawler::crawl`] starts a completely independent traversal with its own
/// queues, worker pool and visited set.
#[derive(Clone)]
pub struct Crawler {
    options: CrawlOptions,
    fetcher: Arc<dyn Fetcher>,
    discovery: Arc<dyn LinkDiscovery>,
}

impl Crawler {
    /// Creates a crawler from explicit collaborators
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Options are valid
    /// * `Err(ConfigError)` - Worker count is out of range
    pub fn new(
        options: CrawlOptions,
        fetcher: Arc<dyn Fetcher>,
        discovery: Arc<dyn LinkDiscovery>,
    ) -> Result<Self, ConfigError> {
        validate_workers(options.workers)?;

        Ok(Self {
            options,
            fetcher,
            discovery,
        })
    }

    /// Creates a crawler that fetches over HTTP and follows HTML anchors
    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(&config.user_agent, &config.fetch)?;
        let crawler = Self::new(
            CrawlOptions::from(config),
            Arc::new(fetcher),
            Arc::new(HtmlLinkDiscovery),
        )?;
        Ok(crawler)
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Starts a crawl from `seed`
    ///
    /// The seed is canonicalized immediately; an invalid seed is reported here
    /// and nothing is fetched. Otherwise the returned [`Crawl`] is lazy: the
    /// worker pool is spawned on the first call to [`Crawl::next`].
    pub fn crawl<F, R>(&self, seed: &str, action: F) -> Result<Crawl<F>, CrawlError>
    where
        F: FnMut(&Content) -> R,
    {
        self.crawl_with_cancellation(seed, action, CancellationToken::new())
    }

    /// Starts a crawl that stops early when `cancel` is triggered
    pub fn crawl_with_cancellation<F, R>(
        &self,
        seed: &str,
        action: F,
        cancel: CancellationToken,
    ) -> Result<Crawl<F>, CrawlError>
    where
        F: FnMut(&Content) -> R,
    {
        let canonicalizer = Canonicalizer::new(self.options.strip_fragments);
        let seed = canonicalizer.canonicalize(seed)?;

        Ok(Crawl::new(self, canonicalizer, seed, action, cancel))
    }
}

/// One running traversal
///
/// Yields `(address, action result)` pairs in the order pages finish
/// fetching. Not restartable; crawl again for a fresh traversal.
pub struct Crawl<F> {
    frontier: FrontierQueue,
    result_tx: ResultSender,
    results: ResultReceiver,
    fetcher: Arc<dyn Fetcher>,
    discovery: Arc<dyn LinkDiscovery>,
    canonicalizer: Canonicalizer,
    action: F,
    cancel: CancellationToken,
    halt: CancellationToken,
    worker_count: usize,
    workers: Vec<JoinHandle<()>>,
    max_depth: u32,
    visited: HashSet<CanonicalUrl>,
    outstanding: usize,
    stats: CrawlStats,
    started_at: Option<Instant>,
    finished: bool,
}

impl<F> Crawl<F> {
    fn new(
        crawler: &Crawler,
        canonicalizer: Canonicalizer,
        seed: CanonicalUrl,
        action: F,
        cancel: CancellationToken,
    ) -> Self {
        let (result_tx, results) = result_queue();
        // Workers stop with the caller's token, or when the crawl is dropped
        let halt = cancel.child_token();

        let mut crawl = Self {
            frontier: FrontierQueue::new(),
            result_tx,
            results,
            fetcher: Arc::clone(&crawler.fetcher),
            discovery: Arc::clone(&crawler.discovery),
            canonicalizer,
            action,
            cancel,
            halt,
            worker_count: crawler.options.workers,
            workers: Vec::with_capacity(crawler.options.workers),
            max_depth: crawler.options.max_depth,
            visited: HashSet::new(),
            outstanding: 0,
            stats: CrawlStats::default(),
            started_at: None,
            finished: false,
        };
        crawl.enqueue(seed, 0);
        crawl
    }

    /// Statistics gathered so far
    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    /// Number of distinct addresses enqueued so far, the seed included
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Frontier items created whose results have not been consumed yet
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// True once the worker pool has been shut down
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Marks `address` visited and hands it to the workers
    ///
    /// Callers must have checked that the address is new.
    fn enqueue(&mut self, address: CanonicalUrl, depth: u32) {
        self.visited.insert(address.clone());
        self.frontier
            .put(FrontierMessage::Fetch(FrontierItem { address, depth }));
        self.outstanding += 1;
        self.stats.frontier_items += 1;
    }

    /// Resolves the page's links and enqueues the unseen ones one level deeper
    fn expand(&mut self, page: &CanonicalUrl, depth: u32, content: &Content) {
        let hrefs = self.discovery.discover_links(content);
        self.stats.links_discovered += hrefs.len() as u64;

        for href in hrefs {
            let address = match self.canonicalizer.resolve(page, &href) {
                Ok(address) => address,
                Err(e) => {
                    tracing::debug!("Skipping link {:?} on {}: {}", href, page, e);
                    self.stats.links_invalid += 1;
                    continue;
                }
            };

            if self.visited.contains(&address) {
                self.stats.links_duplicate += 1;
                continue;
            }

            tracing::trace!("Discovered {} at depth {}", address, depth + 1);
            self.enqueue(address, depth + 1);
        }
    }

    fn start(&mut self) {
        tracing::info!(
            "Starting crawl with {} workers, max depth {}",
            self.worker_count,
            self.max_depth
        );
        self.started_at = Some(Instant::now());
        self.workers = spawn_workers(
            self.worker_count,
            &self.frontier,
            &self.result_tx,
            Arc::clone(&self.fetcher),
            &self.halt,
        );
    }

    fn discard(&mut self, pending: Vec<FrontierMessage>) {
        let discarded = pending
            .iter()
            .filter(|message| matches!(message, FrontierMessage::Fetch(_)))
            .count();
        self.stats.discarded_items += discarded as u64;
    }

    fn send_sentinels(&mut self) {
        for _ in 0..self.worker_count {
            self.frontier.put(FrontierMessage::Shutdown);
        }
        self.stats.shutdown_sentinels = self.worker_count;
        self.finished = true;
    }

    /// Stops the worker pool and waits for every worker to exit
    ///
    /// When work is still outstanding the crawl is being abandoned: workers
    /// are halted first, so fetches in flight are dropped rather than awaited.
    async fn shutdown(&mut self) {
        if self.finished {
            return;
        }

        if self.outstanding > 0 {
            self.halt.cancel();
            let pending = self.frontier.drain().await;
            self.discard(pending);
        }

        self.send_sentinels();

        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                tracing::error!("Fetch worker failed: {}", e);
            }
        }

        if let Some(started_at) = self.started_at {
            self.stats.elapsed = started_at.elapsed();
        }

        tracing::info!(
            "Crawl finished: {} pages processed, {} failed, in {:?}",
            self.stats.pages_yielded,
            self.stats.fetch_failures,
            self.stats.elapsed
        );
    }
}

impl<F, R> Crawl<F>
where
    F: FnMut(&Content) -> R,
{
    /// Waits for the next processed page
    ///
    /// Returns `None` once every reachable page within the depth limit has been
    /// fetched (or the crawl was cancelled). Failed fetches are logged and
    /// skipped; they never end the crawl.
    ///
    /// A page's links are expanded before the page is returned, so workers
    /// keep fetching while the caller handles it. The visited set and depths
    /// come out the same as expanding afterwards.
    pub async fn next(&mut self) -> Option<(CanonicalUrl, R)> {
        if self.finished {
            return None;
        }

        if self.started_at.is_none() {
            self.start();
        }

        while self.outstanding > 0 {
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                item = self.results.recv() => Some(item),
            };

            let item = match received {
                None => {
                    tracing::info!(
                        "Crawl cancelled with {} pages outstanding",
                        self.outstanding
                    );
                    self.stats.cancelled = true;
                    break;
                }
                Some(None) => {
                    tracing::error!(
                        "Result queue closed with {} pages outstanding",
                        self.outstanding
                    );
                    break;
                }
                Some(Some(item)) => item,
            };

            self.outstanding -= 1;

            let content = match item.outcome {
                FetchOutcome::Content(content) => content,
                FetchOutcome::Failure(e) => {
                    tracing::warn!("Failed to fetch {}: {}", item.address, e);
                    self.stats.fetch_failures += 1;
                    continue;
                }
            };

            tracing::debug!("Processing {} (depth {})", item.address, item.depth);
            let result = (self.action)(&content);

            if item.depth < self.max_depth {
                self.expand(&item.address, item.depth, &content);
            }

            self.stats.pages_yielded += 1;
            self.stats.deepest_level = self.stats.deepest_level.max(item.depth);
            self.report_progress();

            return Some((item.address, result));
        }

        self.shutdown().await;
        None
    }

    /// Converts the crawl into a [`Stream`] of processed pages
    pub fn into_stream(self) -> impl Stream<Item = (CanonicalUrl, R)> {
        stream::unfold(self, |mut crawl| async move {
            crawl.next().await.map(|page| (page, crawl))
        })
    }

    fn report_progress(&self) {
        // Progress reporting every 10 pages
        if self.stats.pages_yielded % 10 != 0 {
            return;
        }

        if let Some(started_at) = self.started_at {
            let elapsed = started_at.elapsed();
            let rate = self.stats.pages_yielded as f64 / elapsed.as_secs_f64();
            tracing::info!(
                "Progress: {} pages processed, {} outstanding, {:.2} pages/sec",
                self.stats.pages_yielded,
                self.outstanding,
                rate
            );
        }
    }
}

impl<F> Drop for Crawl<F> {
    fn drop(&mut self) {
        // Abandoned mid-crawl: release the workers instead of leaving them
        // parked on an orphaned queue.
        if !self.finished && self.started_at.is_some() {
            tracing::debug!("Crawl dropped before completion, stopping workers");
            self.halt.cancel();
            // A worker parked on the frontier holds the receiver; it leaves
            // on the halt and the rest of the queue goes with the last handle.
            if let Some(pending) = self.frontier.try_drain() {
                self.discard(pending);
            }
            self.send_sentinels();
        }
    }
}
