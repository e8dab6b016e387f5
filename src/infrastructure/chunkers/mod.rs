//! Chunking strategy family and selection

pub mod code;
pub mod markdown;
pub mod semantic;
pub mod sentence;

pub use code::CodeChunker;
pub use markdown::MarkdownChunker;
pub use semantic::SemanticChunker;
pub use sentence::SentenceChunker;

use std::sync::Arc;

use crate::domain::ingestion::{
    Chunk, ChunkingConfig, ChunkingStrategy, ChunkingType, ParsedDocument,
};

/// Factory for chunking strategies
#[derive(Debug, Default)]
pub struct ChunkerFactory;

impl ChunkerFactory {
    /// Instantiate the strategy for a chunking type
    pub fn create(chunking_type: ChunkingType) -> Arc<dyn ChunkingStrategy> {
        match chunking_type {
            ChunkingType::Sentence => Arc::new(SentenceChunker::new()),
            ChunkingType::Semantic => Arc::new(SemanticChunker::new()),
            ChunkingType::Markdown => Arc::new(MarkdownChunker::new()),
            ChunkingType::Code => Arc::new(CodeChunker::new()),
        }
    }

    /// Strategy a parsed document defaults to, by its source format
    pub fn for_document(document: &ParsedDocument) -> ChunkingType {
        document.source_type.default_chunking()
    }
}

/// Merge undersized non-final chunks into their predecessor when the result
/// stays within budget. The final remainder may stay below `min_tokens`.
pub(crate) fn merge_undersized(chunks: &mut Vec<Chunk>, config: &ChunkingConfig) {
    if chunks.len() < 2 {
        return;
    }

    let mut merged: Vec<Chunk> = Vec::with_capacity(chunks.len());

    for chunk in chunks.drain(..) {
        let should_merge = chunk.token_count < config.min_tokens
            && merged
                .last()
                .map(|prev: &Chunk| {
                    prev.token_count + chunk.token_count <= config.max_tokens
                        && prev.section_title == chunk.section_title
                })
                .unwrap_or(false);

        if should_merge {
            let prev = merged.pop().expect("guarded by should_merge");
            let combined_text = format!("{} {}", prev.text, chunk.text);
            let mut combined = Chunk::new(combined_text, prev.index, prev.start_offset);
            combined.section_title = prev.section_title.clone();
            combined.page_number = prev.page_number;
            merged.push(combined);
        } else {
            merged.push(chunk);
        }
    }

    *chunks = merged;
}
