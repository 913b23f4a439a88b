//! Ripple-Crawl main entry point
//!
//! This is the command-line interface for the Ripple-Crawl keyword crawler.

use anyhow::Context;
use clap::Parser;
use ripple_crawl::config::{load_config_with_hash, Config};
use ripple_crawl::crawler::Crawler;
use ripple_crawl::extract::SentenceMatcher;
use ripple_crawl::output::{print_statistics, write_page};
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Ripple-Crawl: a concurrent keyword crawler
///
/// Ripple-Crawl crawls outward from each seed address, breadth first, up to a
/// fixed number of hops. Every page is searched for sentences mentioning the
/// configured keyword.
#[derive(Parser, Debug)]
#[command(name = "ripple-crawl")]
#[command(version)]
#[command(about = "A concurrent, depth-bounded keyword crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the configured maximum depth
    #[arg(long, value_name = "N")]
    depth: Option<u32>,

    /// Override the configured number of fetch workers
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(depth) = cli.depth {
        config.crawler.max_depth = depth;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }

    if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_crawl(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_crawl=info,warn"),
            1 => EnvFilter::new("ripple_crawl=debug,info"),
            2 => EnvFilter::new("ripple_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    // Catches a bad --workers override the same way a real run would
    Crawler::from_config(config)?;

    println!("=== Ripple-Crawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Workers: {}", config.crawler.workers);
    println!("  Strip fragments: {}", config.crawler.strip_fragments);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nFetch Policy:");
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  Connect timeout: {}s", config.fetch.connect_timeout_secs);
    println!(
        "  Retries: {} (delay {}ms)",
        config.fetch.max_retries, config.fetch.retry_delay_ms
    );

    println!("\nKeyword: {}", config.search.keyword);
    println!("\nSeeds ({}):", config.search.seeds.len());
    for seed in &config.search.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} seed URLs", config.search.seeds.len());

    Ok(())
}

/// Handles the main crawl operation: one independent crawl per seed
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    let crawler = Crawler::from_config(config)?;
    let matcher = SentenceMatcher::new(&config.search.keyword)
        .context("Keyword does not form a valid pattern")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping crawl");
            on_interrupt.cancel();
        }
    });

    tracing::info!(
        "Searching for {:?} from {} seed URLs",
        matcher.keyword(),
        config.search.seeds.len()
    );

    for seed in &config.search.seeds {
        if cancel.is_cancelled() {
            break;
        }

        tracing::info!("Crawling from {}", seed);
        let mut crawl = crawler.crawl_with_cancellation(
            seed,
            |content| matcher.find_sentences(content),
            cancel.clone(),
        )?;

        while let Some((address, sentences)) = crawl.next().await {
            let mut stdout = std::io::stdout().lock();
            write_page(&mut stdout, &address, &sentences)?;
            stdout.flush()?;
        }

        println!();
        print_statistics(seed, crawl.stats());
        println!();
    }

    Ok(())
}
