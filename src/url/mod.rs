//! URL handling module for Ripple-Crawl
//!
//! This module turns raw hrefs into canonical, comparable addresses. Every
//! component that deduplicates or keys on an address goes through
//! [`CanonicalUrl`].

mod canonical;

pub use canonical::{canonicalize, is_single_token, resolve, CanonicalUrl, Canonicalizer};
