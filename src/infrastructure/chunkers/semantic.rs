//! Semantic (paragraph) chunking strategy

use once_cell::sync::Lazy;
use regex::Regex;

use super::sentence::SentenceChunker;
use crate::domain::ingestion::tokenizer::count_tokens;
use crate::domain::ingestion::{renumber, Chunk, ChunkContext, ChunkingConfig, ChunkingStrategy};
use crate::domain::RagError;

static PARAGRAPH_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is valid"));

/// Chunking strategy that accumulates whole paragraphs. A paragraph over
/// the token budget recurses into the sentence strategy.
#[derive(Debug, Clone, Default)]
pub struct SemanticChunker;

impl SemanticChunker {
    /// Create a new semantic chunker
    pub fn new() -> Self {
        Self
    }
}

impl ChunkingStrategy for SemanticChunker {
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

        let sentence_chunker = SentenceChunker::new();

        let mut chunks: Vec<Chunk> = Vec::new();
        // (paragraph, offset) pairs accumulated into the open chunk
        let mut current: Vec<(String, usize)> = Vec::new();
        let mut current_tokens = 0usize;
        let mut cursor = 0usize;

        let flush = |current: &mut Vec<(String, usize)>,
                     current_tokens: &mut usize,
                     chunks: &mut Vec<Chunk>,
                     ctx: &ChunkContext| {
            if current.is_empty() {
                return;
            }
            let start = current[0].1;
            let joined = current
                .iter()
                .map(|(p, _)| p.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            chunks.push(Chunk::with_context(joined, 0, start, ctx));
            current.clear();
            *current_tokens = 0;
        };

        for raw_paragraph in PARAGRAPH_SPLIT.split(text) {
            let paragraph = raw_paragraph.trim();
            let paragraph_offset = cursor;
            cursor += raw_paragraph.len() + 2;

            if paragraph.is_empty() {
                continue;
            }

            let paragraph_tokens = count_tokens(paragraph);

            if paragraph_tokens > config.max_tokens {
                flush(&mut current, &mut current_tokens, &mut chunks, ctx);

                let mut inner = sentence_chunker.chunk(paragraph, ctx, config)?;
                for chunk in &mut inner {
                    chunk.start_offset += paragraph_offset;
                    chunk.end_offset += paragraph_offset;
                }
                chunks.extend(inner);
                continue;
            }

            if current_tokens + paragraph_tokens > config.max_tokens && !current.is_empty() {
                flush(&mut current, &mut current_tokens, &mut chunks, ctx);
            }

            current_tokens += paragraph_tokens;
            current.push((paragraph.to_string(), paragraph_offset));
        }

        flush(&mut current, &mut current_tokens, &mut chunks, ctx);

        super::merge_undersized(&mut chunks, config);
        renumber(&mut chunks);

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "semantic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: usize) -> ChunkingConfig {
        ChunkingConfig::new(max, 0).with_min_tokens(2)
    }

    #[test]
    fn test_empty_content() {
        let chunker = SemanticChunker::new();
        let chunks = chunker
            .chunk("", &ChunkContext::new(), &config(100))
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_small_paragraphs_combine() {
        let chunker = SemanticChunker::new();
        let text = "First short paragraph.\n\nSecond short paragraph.";

        let chunks = chunker
            .chunk(text, &ChunkContext::new(), &config(100))
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("First short"));
        assert!(chunks[0].text.contains("Second short"));
        assert!(chunks[0].text.contains("\n\n"));
    }

    #[test]
    fn test_paragraphs_split_when_over_budget() {
        let chunker = SemanticChunker::new();
        let text = "The first paragraph discusses the pricing model in moderate detail for everyone.\n\n\
                    The second paragraph discusses the onboarding flow in moderate detail for everyone.\n\n\
                    The third paragraph discusses the billing cycle in moderate detail for everyone.";

        let chunks = chunker
            .chunk(text, &ChunkContext::new(), &config(20))
            .unwrap();

        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.token_count <= 20);
        }
    }

    #[test]
    fn test_oversized_paragraph_recurses_into_sentences() {
        let chunker = SemanticChunker::new();
        let text = "Sentence one about topics. Sentence two about topics. Sentence three \
                    about topics. Sentence four about topics. Sentence five about topics.";

        let chunks = chunker
            .chunk(text, &ChunkContext::new(), &config(12))
            .unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.token_count <= 12);
        }
    }

    #[test]
    fn test_whitespace_between_paragraphs_tolerated() {
        let chunker = SemanticChunker::new();
        let text = "Para one.\n   \nPara two.\n\t\nPara three.";

        let chunks = chunker
            .chunk(text, &ChunkContext::new(), &config(100))
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("Para two"));
    }

    #[test]
    fn test_indices_sequential_across_recursion() {
        let chunker = SemanticChunker::new();
        let text = "Short intro.\n\nSentence one about stuff. Sentence two about stuff. \
                    Sentence three about stuff. Sentence four about stuff.\n\nShort outro.";

        let chunks = chunker
            .chunk(text, &ChunkContext::new(), &config(12))
            .unwrap();

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_reconstruction_modulo_whitespace() {
        let chunker = SemanticChunker::new();
        let text = "Alpha beta gamma.\n\nDelta epsilon zeta.\n\nEta theta iota.";

        let chunks = chunker
            .chunk(text, &ChunkContext::new(), &config(8))
            .unwrap();

        let rebuilt: String = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");

        assert_eq!(normalize(&rebuilt), normalize(text));
    }

    #[test]
    fn test_name() {
        assert_eq!(SemanticChunker::new().name(), "semantic");
    }
}
