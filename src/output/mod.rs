//! Output module for reporting crawl results
//!
//! This module handles:
//! - Printing each processed page with the sentences found on it
//! - Recording and printing crawl statistics

pub mod stats;

pub use stats::{print_statistics, CrawlStats};

use crate::url::CanonicalUrl;
use std::io::{self, Write};

/// Writes one processed page and its matching sentences
///
/// The address goes on its own line and every sentence follows indented by
/// two spaces. Pages without matches are written as a bare address.
pub fn write_page<W: Write>(
    out: &mut W,
    address: &CanonicalUrl,
    sentences: &[String],
) -> io::Result<()> {
    writeln!(out, "{}", address)?;
    for sentence in sentences {
        writeln!(out, "  {}", sentence)?;
    }
    Ok(())
}
