//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive the real
//! HTTP fetcher through full crawls end-to-end.

use ripple_crawl::config::{parse_config, FetchConfig, UserAgentConfig};
use ripple_crawl::crawler::{Content, Crawl, CrawlOptions, Crawler, HtmlLinkDiscovery, HttpFetcher};
use ripple_crawl::extract::SentenceMatcher;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates an HTML response with the given links and paragraph text
fn html_page(links: &[&str], text: &str) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    let body = format!(
        "<html><body><p>{}</p>{}</body></html>",
        text, anchors
    );
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_page(server: &MockServer, page: &str, response: ResponseTemplate, hits: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(response)
        .expect(hits)
        .mount(server)
        .await;
}

fn test_fetch_config() -> FetchConfig {
    FetchConfig {
        timeout_secs: 5,
        connect_timeout_secs: 5,
        max_retries: 0,
        retry_delay_ms: 10,
    }
}

/// Creates a crawler that talks HTTP with no retries
fn test_crawler(max_depth: u32, workers: usize) -> Crawler {
    let fetcher = HttpFetcher::new(&UserAgentConfig::default(), &test_fetch_config())
        .expect("Failed to build HTTP client");
    let options = CrawlOptions {
        workers,
        max_depth,
        strip_fragments: false,
    };
    Crawler::new(options, Arc::new(fetcher), Arc::new(HtmlLinkDiscovery))
        .expect("Failed to create crawler")
}

/// Runs a crawl to completion and returns paths (relative to the server) with results
async fn run_to_end<F, R>(crawl: &mut Crawl<F>, base: &str) -> Vec<(String, R)>
where
    F: FnMut(&Content) -> R,
{
    let mut pages = Vec::new();
    while let Some((address, result)) = tokio::time::timeout(Duration::from_secs(10), crawl.next())
        .await
        .expect("Crawl did not finish in time")
    {
        let relative = address
            .as_str()
            .strip_prefix(base)
            .unwrap_or(address.as_str())
            .to_string();
        pages.push((relative, result));
    }
    pages.sort_by(|a, b| a.0.cmp(&b.0));
    pages
}

#[tokio::test]
async fn test_full_crawl_finds_sentences() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page(&["/a", "b"], "Welcome to the Rust site. Nothing else here."),
        1,
    )
    .await;
    mount_page(
        &server,
        "/a",
        html_page(&["/c"], "Rust is fast. Go is simple."),
        1,
    )
    .await;
    mount_page(&server, "/b", html_page(&[], "No keyword on this page."), 1).await;
    mount_page(
        &server,
        "/c",
        html_page(&["/d"], "Is Rust hard? Not really."),
        1,
    )
    .await;
    // Beyond the depth limit
    mount_page(&server, "/d", html_page(&[], "Rust everywhere."), 0).await;

    let matcher = SentenceMatcher::new("Rust").unwrap();
    let crawler = test_crawler(2, 4);
    let mut crawl = crawler
        .crawl(&format!("{}/", base), |content| matcher.find_sentences(content))
        .unwrap();

    let pages = run_to_end(&mut crawl, &base).await;

    assert_eq!(
        pages,
        vec![
            ("/".to_string(), vec!["Welcome to the Rust site.".to_string()]),
            ("/a".to_string(), vec!["Rust is fast.".to_string()]),
            ("/b".to_string(), vec![]),
            ("/c".to_string(), vec!["Is Rust hard?".to_string()]),
        ]
    );

    let stats = crawl.stats();
    assert_eq!(stats.pages_yielded, 4);
    assert_eq!(stats.fetch_failures, 0);
    assert_eq!(stats.deepest_level, 2);
    assert_eq!(stats.shutdown_sentinels, 4);
}

#[tokio::test]
async fn test_depth_zero_fetches_only_seed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page(&["/a"], "Seed."), 1).await;
    mount_page(&server, "/a", html_page(&[], "Never."), 0).await;

    let crawler = test_crawler(0, 2);
    let mut crawl = crawler
        .crawl(&format!("{}/", base), |content| content.body.len())
        .unwrap();

    let pages = run_to_end(&mut crawl, &base).await;
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].0, "/");
}

#[tokio::test]
async fn test_failed_page_is_isolated() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page(&["/missing", "/ok"], "Seed."), 1).await;
    mount_page(&server, "/missing", ResponseTemplate::new(404), 1).await;
    mount_page(&server, "/ok", html_page(&["/deeper"], "Fine."), 1).await;
    mount_page(&server, "/deeper", html_page(&[], "Deep."), 1).await;

    let crawler = test_crawler(2, 3);
    let mut crawl = crawler
        .crawl(&format!("{}/", base), |_: &Content| ())
        .unwrap();

    let pages = run_to_end(&mut crawl, &base).await;
    let paths: Vec<&str> = pages.iter().map(|(p, _)| p.as_str()).collect();

    assert_eq!(paths, vec!["/", "/deeper", "/ok"]);
    assert_eq!(crawl.stats().fetch_failures, 1);
}

#[tokio::test]
async fn test_failing_seed_yields_nothing() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", ResponseTemplate::new(500), 1).await;

    let crawler = test_crawler(3, 2);
    let mut crawl = crawler
        .crawl(&format!("{}/", base), |_: &Content| ())
        .unwrap();

    assert!(run_to_end(&mut crawl, &base).await.is_empty());
    assert_eq!(crawl.stats().fetch_failures, 1);
    assert!(crawl.is_finished());
}

#[tokio::test]
async fn test_non_html_content_is_a_failure() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page(&["/report.pdf"], "Seed."), 1).await;
    mount_page(
        &server,
        "/report.pdf",
        ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"),
        1,
    )
    .await;

    let crawler = test_crawler(1, 2);
    let mut crawl = crawler
        .crawl(&format!("{}/", base), |_: &Content| ())
        .unwrap();

    let pages = run_to_end(&mut crawl, &base).await;
    assert_eq!(pages.len(), 1);
    assert_eq!(crawl.stats().fetch_failures, 1);
}

#[tokio::test]
async fn test_equivalent_links_fetched_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    let absolute = format!("{}/shared", base);
    mount_page(
        &server,
        "/",
        html_page(
            &["/shared", "shared", "./shared", &absolute, "/x/../shared"],
            "Seed.",
        ),
        1,
    )
    .await;
    mount_page(&server, "/shared", html_page(&["/"], "Shared."), 1).await;

    let crawler = test_crawler(3, 4);
    let mut crawl = crawler
        .crawl(&format!("{}/", base), |_: &Content| ())
        .unwrap();

    let pages = run_to_end(&mut crawl, &base).await;
    assert_eq!(pages.len(), 2);
    assert_eq!(crawl.stats().frontier_items, 2);
}

#[tokio::test]
async fn test_self_links_not_refetched() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page(&["/", "./", "/index"], "Seed."), 1).await;
    mount_page(&server, "/index", html_page(&["/"], "Index."), 1).await;

    let crawler = test_crawler(5, 2);
    let mut crawl = crawler
        .crawl(&format!("{}/", base), |_: &Content| ())
        .unwrap();

    assert_eq!(run_to_end(&mut crawl, &base).await.len(), 2);
}

#[tokio::test]
async fn test_transient_failure_retried() {
    let server = MockServer::start().await;
    let base = server.uri();

    // First attempt fails, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", html_page(&[], "Recovered."), 1).await;

    let fetch = FetchConfig {
        max_retries: 2,
        ..test_fetch_config()
    };
    let fetcher = HttpFetcher::new(&UserAgentConfig::default(), &fetch).unwrap();
    let crawler = Crawler::new(
        CrawlOptions::default(),
        Arc::new(fetcher),
        Arc::new(HtmlLinkDiscovery),
    )
    .unwrap();

    let mut crawl = crawler
        .crawl(&format!("{}/", base), |_: &Content| ())
        .unwrap();
    assert_eq!(run_to_end(&mut crawl, &base).await.len(), 1);
    assert_eq!(crawl.stats().fetch_failures, 0);
}

#[tokio::test]
async fn test_crawler_from_config_sends_user_agent() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact)",
        ))
        .respond_with(html_page(&[], "Seed."))
        .expect(1)
        .mount(&server)
        .await;

    let config = parse_config(&format!(
        r#"
[crawler]
max-depth = 1
workers = 2

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"

[fetch]
max-retries = 0

[search]
keyword = "Seed"
seeds = ["{}/"]
"#,
        base
    ))
    .unwrap();

    let crawler = Crawler::from_config(&config).unwrap();
    assert_eq!(crawler.options().workers, 2);

    let mut crawl = crawler
        .crawl(&config.search.seeds[0], |_: &Content| ())
        .unwrap();
    assert_eq!(run_to_end(&mut crawl, &base).await.len(), 1);
}

#[tokio::test]
async fn test_stream_interface() {
    use futures::StreamExt;

    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page(&["/a", "/b"], "Seed."), 1).await;
    mount_page(&server, "/a", html_page(&[], "A."), 1).await;
    mount_page(&server, "/b", html_page(&[], "B."), 1).await;

    let crawler = test_crawler(1, 3);
    let crawl = crawler
        .crawl(&format!("{}/", base), |content| content.body.contains("<p>Seed.</p>"))
        .unwrap();

    let results: Vec<bool> = crawl.into_stream().map(|(_, is_seed)| is_seed).collect().await;
    assert_eq!(results.len(), 3);
    assert_eq!(results.iter().filter(|is_seed| **is_seed).count(), 1);
}
