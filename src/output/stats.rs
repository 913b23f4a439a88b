//! Crawl statistics
//!
//! Counters kept by the coordinator while it drives a crawl, and a formatted
//! printout for the command line.

use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Pages fetched, processed and yielded to the caller
    pub pages_yielded: u64,

    /// Pages whose fetch failed (never processed or expanded)
    pub fetch_failures: u64,

    /// Frontier items created, the seed included
    pub frontier_items: u64,

    /// Raw hrefs returned by link discovery
    pub links_discovered: u64,

    /// Hrefs rejected by the canonicalizer
    pub links_invalid: u64,

    /// Hrefs that resolved to an already visited address
    pub links_duplicate: u64,

    /// Deepest level at which a page was yielded
    pub deepest_level: u32,

    /// Shutdown sentinels sent to the worker pool
    pub shutdown_sentinels: usize,

    /// Pending frontier items thrown away on cancellation
    pub discarded_items: u64,

    /// Whether the crawl was stopped by its cancellation token
    pub cancelled: bool,

    /// Wall-clock time from the first poll to shutdown
    pub elapsed: Duration,
}

impl CrawlStats {
    /// Fraction of attempted pages that were fetched successfully, in percent
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_yielded + self.fetch_failures;
        if attempted > 0 {
            (self.pages_yielded as f64 / attempted as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `seed` - The address the crawl started from
/// * `stats` - The statistics to display
pub fn print_statistics(seed: &str, stats: &CrawlStats) {
    println!("=== Crawl Statistics: {} ===\n", seed);

    println!("Overview:");
    println!("  Pages processed: {}", stats.pages_yielded);
    println!("  Fetch failures: {}", stats.fetch_failures);
    println!("  Frontier items: {}", stats.frontier_items);
    println!("  Deepest level: {}", stats.deepest_level);
    println!("  Elapsed: {:.2?}", stats.elapsed);
    println!();

    println!("Links:");
    println!("  Discovered: {}", stats.links_discovered);
    println!("  Invalid: {}", stats.links_invalid);
    println!("  Already visited: {}", stats.links_duplicate);
    println!();

    if stats.cancelled {
        println!(
            "Cancelled: {} pending pages discarded",
            stats.discarded_items
        );
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully fetched)",
        stats.success_rate(),
        stats.pages_yielded,
        stats.pages_yielded + stats.fetch_failures
    );
}
