//! Keyword sentence search
//!
//! A sentence is a run of text that starts with a capital letter and ends at
//! the first `.`, `?` or `!`. Sentences never span text nodes, so a sentence
//! split by inline markup is not found. Sentences are reported with their
//! whitespace collapsed, in page order, once per occurrence.

use crate::crawler::Content;
use crate::extract::text::text_nodes;
use regex::Regex;

const SENTENCE_PATTERN: &str = r"[A-Z][^.?!]*[.?!]";

/// Finds the sentences on a page that mention a keyword
///
/// The keyword matches case-sensitively and as a whole word, so `Rust` finds
/// "Rust is fast." but not "Rusty nails."
///
/// # Example
///
/// ```
/// use ripple_crawl::crawler::Content;
/// use ripple_crawl::extract::SentenceMatcher;
///
/// let matcher = SentenceMatcher::new("Rust").unwrap();
/// let page = Content::new("<p>Rust is fast. Go is too. Is Rust safe?</p>");
/// assert_eq!(
///     matcher.find_sentences(&page),
///     vec!["Rust is fast.".to_string(), "Is Rust safe?".to_string()]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SentenceMatcher {
    keyword: String,
    sentence: Regex,
    mention: Regex,
}

impl SentenceMatcher {
    pub fn new(keyword: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            keyword: keyword.to_string(),
            sentence: Regex::new(SENTENCE_PATTERN)?,
            mention: Regex::new(&mention_pattern(keyword))?,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Returns the matching sentences of an HTML page
    pub fn find_sentences(&self, content: &Content) -> Vec<String> {
        text_nodes(content.as_str())
            .iter()
            .flat_map(|node| self.find_in_text(node))
            .collect()
    }

    /// Returns the matching sentences of plain text
    pub fn find_in_text(&self, text: &str) -> Vec<String> {
        self.sentence
            .find_iter(text)
            .map(|m| collapse_whitespace(m.as_str()))
            .filter(|sentence| self.mention.is_match(sentence))
            .collect()
    }
}

/// Word boundaries are only required on sides where the keyword has a word
/// character, otherwise `C++` could never match.
fn mention_pattern(keyword: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let leading = keyword.chars().next().is_some_and(is_word);
    let trailing = keyword.chars().last().is_some_and(is_word);

    format!(
        "{}{}{}",
        if leading { r"\b" } else { "" },
        regex::escape(keyword),
        if trailing { r"\b" } else { "" }
    )
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
