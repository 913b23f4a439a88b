//! Page actions that pull information out of fetched content
//!
//! The crawler itself is indifferent to what is done with a page; these are
//! the actions the command line uses.

mod sentences;
mod text;

pub use sentences::SentenceMatcher;
pub use text::text_nodes;
