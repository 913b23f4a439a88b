use crate::UrlError;
use std::fmt;
use url::Url;

/// Schemes the crawler is able to fetch
const FETCHABLE_SCHEMES: &[&str] = &["http", "https"];

/// An absolute address in canonical form
///
/// Two addresses that name the same resource after percent-encoding and
/// relative resolution serialize to the same string, and therefore compare
/// equal and hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl(Url);

impl CanonicalUrl {
    /// Returns the canonical string form
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the underlying parsed URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Produces canonical addresses from raw hrefs
///
/// # Canonicalization Steps
///
/// 1. Trim surrounding ASCII whitespace; reject if empty
/// 2. Reject hrefs with whitespace left inside them (not a single token)
/// 3. Parse (or resolve against a base) with standard relative-reference rules.
///    The parser percent-encodes non-ASCII and unsafe characters in the path,
///    query and fragment and leaves existing `%XX` escapes and `/` alone, so
///    an already-encoded address is never encoded twice
/// 4. Reject anything that is not HTTP or HTTPS
/// 5. Optionally drop the fragment
#[derive(Debug, Clone, Copy, Default)]
pub struct Canonicalizer {
    strip_fragments: bool,
}

impl Canonicalizer {
    /// Creates a canonicalizer
    ///
    /// With `strip_fragments` set, `page#a` and `page#b` become the same
    /// resource.
    pub fn new(strip_fragments: bool) -> Self {
        Self { strip_fragments }
    }

    /// Canonicalizes an absolute address
    pub fn canonicalize(&self, raw: &str) -> Result<CanonicalUrl, UrlError> {
        let href = single_token(raw)?;
        let url = Url::parse(href).map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;
        self.finish(url)
    }

    /// Resolves a possibly-relative href against `base`
    ///
    /// An absolute href ignores the base entirely.
    pub fn resolve(&self, base: &CanonicalUrl, raw: &str) -> Result<CanonicalUrl, UrlError> {
        let href = single_token(raw)?;
        let url = base
            .as_url()
            .join(href)
            .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;
        self.finish(url)
    }

    fn finish(&self, mut url: Url) -> Result<CanonicalUrl, UrlError> {
        if !FETCHABLE_SCHEMES.contains(&url.scheme()) {
            return Err(UrlError::InvalidScheme(url.scheme().to_string()));
        }

        if self.strip_fragments {
            url.set_fragment(None);
        }

        Ok(CanonicalUrl(url))
    }
}

/// Returns true if `raw` is usable as a single address token
///
/// Surrounding whitespace is tolerated, whitespace inside is not.
pub fn is_single_token(raw: &str) -> bool {
    single_token(raw).is_ok()
}

fn single_token(raw: &str) -> Result<&str, UrlError> {
    let href = raw.trim_matches(|c: char| c.is_ascii_whitespace());

    if href.is_empty() {
        return Err(UrlError::Empty);
    }

    if href.chars().any(char::is_whitespace) {
        return Err(UrlError::Whitespace(href.to_string()));
    }

    Ok(href)
}

/// Canonicalizes an absolute address, keeping its fragment
///
/// # Examples
///
/// ```
/// use ripple_crawl::url::canonicalize;
///
/// let url = canonicalize("https://EXAMPLE.com/zażółć").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/za%C5%BC%C3%B3%C5%82%C4%87");
/// ```
pub fn canonicalize(raw: &str) -> Result<CanonicalUrl, UrlError> {
    Canonicalizer::default().canonicalize(raw)
}

/// Resolves `raw` against `base`, keeping the fragment
///
/// # Examples
///
/// ```
/// use ripple_crawl::url::{canonicalize, resolve};
///
/// let base = canonicalize("https://example.com/docs/intro").unwrap();
/// let url = resolve(&base, "../about").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about");
/// ```
pub fn resolve(base: &CanonicalUrl, raw: &str) -> Result<CanonicalUrl, UrlError> {
    Canonicalizer::default().resolve(base, raw)
}
