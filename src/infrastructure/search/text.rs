//! Query/document tokenization shared by BM25, highlighting, and reranking

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("pattern is valid"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "is", "at", "which", "on", "a", "an", "and", "or", "but", "in", "with", "to",
        "for", "of", "as", "by", "that", "this", "it", "from", "be", "are", "been", "was",
        "were",
    ]
    .into_iter()
    .collect()
});

/// Lowercase, strip punctuation, drop stop words and tokens of one or two
/// characters. The same function scores documents and queries so the two
/// sides always agree on token identity.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned = NON_WORD.replace_all(text, " ");

    cleaned
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .filter(|t| t.len() > 2 && !STOP_WORDS.contains(t.as_str()))
        .collect()
}
