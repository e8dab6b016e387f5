//! Token counting shared by every chunking strategy
//!
//! All chunk boundaries in this crate are expressed in cl100k_base tokens so
//! that boundaries produced by different strategies stay comparable.

use once_cell::sync::Lazy;
use tiktoken_rs::CoreBPE;

static BPE: Lazy<CoreBPE> =
    Lazy::new(|| tiktoken_rs::cl100k_base().expect("bundled cl100k_base vocabulary loads"));

/// Count tokens in a text. Deterministic: the same text always yields the
/// same count.
pub fn count_tokens(text: &str) -> usize {
    BPE.encode_ordinary(text).len()
}

/// Cheap token estimate (~4 characters per token) used for context budgeting
/// where exact counts are not worth a full encode.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}
