//! Chunking strategy trait and types

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

use super::tokenizer;
use crate::domain::RagError;

static CODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```|\bdef |\bclass |\bfunction |\bimport |\bfrom |\bfn ")
        .expect("code detection pattern is valid")
});

/// Configuration for chunking, expressed in tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum tokens per chunk
    pub max_tokens: usize,
    /// Overlap between consecutive chunks in tokens
    pub overlap_tokens: usize,
    /// Minimum tokens per chunk; smaller chunks are only emitted as the
    /// final remainder of a document
    pub min_tokens: usize,
}

impl ChunkingConfig {
    /// Create a new chunking configuration
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            max_tokens,
            overlap_tokens,
            min_tokens: 100,
        }
    }

    /// Set minimum chunk size in tokens
    pub fn with_min_tokens(mut self, min_tokens: usize) -> Self {
        self.min_tokens = min_tokens;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RagError> {
        if self.max_tokens == 0 {
            return Err(RagError::validation("max_tokens must be greater than 0"));
        }

        if self.overlap_tokens >= self.max_tokens {
            return Err(RagError::validation(
                "overlap_tokens must be less than max_tokens",
            ));
        }

        if self.min_tokens > self.max_tokens {
            return Err(RagError::validation(
                "min_tokens must be less than or equal to max_tokens",
            ));
        }

        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            overlap_tokens: 128,
            min_tokens: 100,
        }
    }
}

/// Structural context handed to a chunking strategy alongside the text
#[derive(Debug, Clone, Default)]
pub struct ChunkContext {
    /// Enclosing section title, if known
    pub section_title: Option<String>,
    /// Page number, if known
    pub page_number: Option<u32>,
    /// Programming language for code content
    pub language: Option<String>,
}

impl ChunkContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the section title
    pub fn with_section_title(mut self, title: impl Into<String>) -> Self {
        self.section_title = Some(title.into());
        self
    }

    /// Set the page number
    pub fn with_page_number(mut self, page: u32) -> Self {
        self.page_number = Some(page);
        self
    }

    /// Set the language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// A retrieval-sized unit of text produced by a chunking strategy.
///
/// Chunks are immutable after creation and carry their `index` so consumers
/// can reconstruct overlap ordering. `end_offset - start_offset` always
/// equals the chunk text length in the coordinates the strategy worked in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk id
    pub id: Uuid,
    /// 0-based position within the document
    pub index: usize,
    /// Chunk text
    pub text: String,
    /// Start offset in source coordinates
    pub start_offset: usize,
    /// End offset in source coordinates
    pub end_offset: usize,
    /// Whitespace-separated word count
    pub word_count: usize,
    /// Token count under the shared tokenizer
    pub token_count: usize,
    /// Heuristic flag for code-bearing content
    pub has_code: bool,
    /// Nearest enclosing section title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    /// Page number for page-structured sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

impl Chunk {
    /// Create a chunk, deriving counts from the text
    pub fn new(text: impl Into<String>, index: usize, start_offset: usize) -> Self {
        let text = text.into();
        let word_count = text.split_whitespace().count();
        let token_count = tokenizer::count_tokens(&text);
        let has_code = CODE_PATTERN.is_match(&text);
        let end_offset = start_offset + text.len();

        Self {
            id: Uuid::new_v4(),
            index,
            text,
            start_offset,
            end_offset,
            word_count,
            token_count,
            has_code,
            section_title: None,
            page_number: None,
        }
    }

    /// Create a chunk carrying its structural context
    pub fn with_context(
        text: impl Into<String>,
        index: usize,
        start_offset: usize,
        ctx: &ChunkContext,
    ) -> Self {
        let mut chunk = Self::new(text, index, start_offset);
        chunk.section_title = ctx.section_title.clone();
        chunk.page_number = ctx.page_number;
        chunk
    }

    /// Chunk text length in bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if the chunk is empty
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Strategy selector for chunking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingType {
    /// Accumulate whole sentences
    Sentence,
    /// Accumulate whole paragraphs, recursing into sentences when oversized
    #[default]
    Semantic,
    /// Header-aware markdown splitting with code blocks kept intact
    Markdown,
    /// Function/class boundary splitting for source code
    Code,
}

/// Trait for chunking strategies.
///
/// Chunking is synchronous CPU-bound work; callers dispatch it to a blocking
/// worker for large inputs rather than strategies going async themselves.
pub trait ChunkingStrategy: Send + Sync + Debug {
    /// Split text into ordered chunks
    fn chunk(
        &self,
        text: &str,
        ctx: &ChunkContext,
        config: &ChunkingConfig,
    ) -> Result<Vec<Chunk>, RagError>;

    /// Get the strategy name
    fn name(&self) -> &'static str;
}

/// Renumber chunks sequentially, preserving their order
pub fn renumber(chunks: &mut [Chunk]) {
    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.index = i;
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Mock chunking strategy for testing
    #[derive(Debug)]
    pub struct MockChunkingStrategy {
        result: Mutex<Option<Result<Vec<Chunk>, String>>>,
    }

    impl MockChunkingStrategy {
        pub fn new() -> Self {
            Self {
                result: Mutex::new(None),
            }
        }

        pub fn with_result(self, chunks: Vec<Chunk>) -> Self {
            *self.result.lock().unwrap() = Some(Ok(chunks));
            self
        }

        pub fn with_error(self, error: impl Into<String>) -> Self {
            *self.result.lock().unwrap() = Some(Err(error.into()));
            self
        }
    }

    impl Default for MockChunkingStrategy {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ChunkingStrategy for MockChunkingStrategy {
        fn chunk(
            &self,
            text: &str,
            ctx: &ChunkContext,
            config: &ChunkingConfig,
        ) -> Result<Vec<Chunk>, RagError> {
            if let Some(result) = self.result.lock().unwrap().take() {
                return result.map_err(RagError::validation);
            }

            config.validate()?;

            if text.trim().is_empty() {
                return Ok(vec![]);
            }

            Ok(vec![Chunk::with_context(text, 0, 0, ctx)])
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }
}
