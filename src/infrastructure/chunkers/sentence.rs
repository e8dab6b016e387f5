//! Sentence-based chunking strategy

use unicode_segmentation::UnicodeSegmentation;

use crate::domain::ingestion::tokenizer::count_tokens;
use crate::domain::ingestion::{renumber, Chunk, ChunkContext, ChunkingConfig, ChunkingStrategy};
use crate::domain::RagError;

/// Chunking strategy that accumulates whole sentences up to the token
/// budget. A single sentence over the budget is split at word boundaries
/// as the exception path; those chunks may not end on sentence bounds.
#[derive(Debug, Clone, Default)]
pub struct SentenceChunker;

impl SentenceChunker {
    /// Create a new sentence chunker
    pub fn new() -> Self {
        Self
    }

    fn split_oversized_sentence(
        sentence: &str,
        base_offset: usize,
        ctx: &ChunkContext,
        config: &ChunkingConfig,
        chunks: &mut Vec<Chunk>,
    ) {
        let mut current_words: Vec<&str> = Vec::new();
        let mut current_tokens = 0usize;
        let mut segment_offset = base_offset;
        let mut consumed = 0usize;

        for word in sentence.split_whitespace() {
            let word_tokens = count_tokens(word).max(1);

            if current_tokens + word_tokens > config.max_tokens && !current_words.is_empty() {
                let segment = current_words.join(" ");
                let segment_len = segment.len();
                chunks.push(Chunk::with_context(segment, 0, segment_offset, ctx));

                segment_offset = base_offset + consumed;
                current_words = vec![word];
                current_tokens = word_tokens;
            } else {
                current_words.push(word);
                current_tokens += word_tokens;
            }

            consumed += word.len() + 1;
        }

        if !current_words.is_empty() {
            let segment = current_words.join(" ");
            chunks.push(Chunk::with_context(segment, 0, segment_offset, ctx));
        }
    }

    /// Trailing sentences of the finished chunk that fit in the overlap
    /// budget, oldest first
    fn overlap_tail(
        accumulated: &[(String, usize)],
        overlap_tokens: usize,
    ) -> Vec<(String, usize)> {
        if overlap_tokens == 0 {
            return Vec::new();
        }

        let mut tail = Vec::new();
        let mut used = 0usize;

        for (sentence, offset) in accumulated.iter().rev() {
            let tokens = count_tokens(sentence);
            if used + tokens > overlap_tokens {
                break;
            }
            used += tokens;
            tail.push((sentence.clone(), *offset));
        }

        tail.reverse();
        tail
    }
}

impl ChunkingStrategy for SentenceChunker {
    fn chunk(
        &self,
        text: &str,
        ctx: &ChunkContext,
        config: &ChunkingConfig,
    ) -> Result<Vec<Chunk>, RagError> {
        config.validate()?;

        let text = text.trim();
        if text.is_empty() {
            return Ok(vec![]);
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        // (sentence, offset) pairs accumulated into the open chunk
        let mut current: Vec<(String, usize)> = Vec::new();
        let mut current_tokens = 0usize;
        let mut cursor = 0usize;

        for raw_sentence in text.unicode_sentences() {
            let sentence = raw_sentence.trim();
            let sentence_offset = cursor;
            cursor += raw_sentence.len();

            if sentence.is_empty() {
                continue;
            }

            let sentence_tokens = count_tokens(sentence);

            if sentence_tokens > config.max_tokens {
                if !current.is_empty() {
                    let start = current[0].1;
                    let joined = current
                        .iter()
                        .map(|(s, _)| s.as_str())
                        .collect::<Vec<_>>()
                        .join(" ");
                    chunks.push(Chunk::with_context(joined, 0, start, ctx));
                    current.clear();
                    current_tokens = 0;
                }

                Self::split_oversized_sentence(sentence, sentence_offset, ctx, config, &mut chunks);
                continue;
            }

            if current_tokens + sentence_tokens > config.max_tokens && !current.is_empty() {
                let start = current[0].1;
                let joined = current
                    .iter()
                    .map(|(s, _)| s.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                chunks.push(Chunk::with_context(joined, 0, start, ctx));

                // Cap the carried overlap so overlap plus the incoming
                // sentence stays within the chunk budget
                let budget = config
                    .overlap_tokens
                    .min(config.max_tokens.saturating_sub(sentence_tokens));
                let tail = Self::overlap_tail(&current, budget);
                current_tokens = tail.iter().map(|(s, _)| count_tokens(s)).sum();
                current = tail;
            }

            current_tokens += sentence_tokens;
            current.push((sentence.to_string(), sentence_offset));
        }

        // Final remainder is emitted even when below min_tokens
        if !current.is_empty() {
            let start = current[0].1;
            let joined = current
                .iter()
                .map(|(s, _)| s.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            chunks.push(Chunk::with_context(joined, 0, start, ctx));
        }

        super::merge_undersized(&mut chunks, config);
        renumber(&mut chunks);

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "sentence"
    }
}
