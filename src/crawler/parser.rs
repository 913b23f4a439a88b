//! HTML link discovery
//!
//! This module extracts raw `href` values from page markup. Resolution and
//! validation of those hrefs is left to the coordinator, which owns the
//! canonicalizer and the visited set.

use crate::crawler::queue::Content;
use scraper::{Html, Selector};

/// Source of outgoing links for a fetched page
pub trait LinkDiscovery: Send + Sync {
    /// Returns raw href strings in document order
    fn discover_links(&self, content: &Content) -> Vec<String>;
}

/// [`LinkDiscovery`] for HTML documents
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `<link>`, `<script>`, `<img>` and other non-anchor references
///
/// Hrefs are returned untouched, relative ones included.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLinkDiscovery;

impl LinkDiscovery for HtmlLinkDiscovery {
    fn discover_links(&self, content: &Content) -> Vec<String> {
        extract_hrefs(content.as_str())
    }
}

/// Extracts every anchor href from the HTML document
///
/// # Example
///
/// ```
/// use ripple_crawl::crawler::extract_hrefs;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// assert_eq!(extract_hrefs(html), vec!["/page".to_string()]);
/// ```
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                links.push(href.to_string());
            }
        }
    }

    links
}
