//! Domain layer - core types, traits, and error taxonomy

pub mod cache;
pub mod completion;
pub mod embedding;
pub mod error;
pub mod ingestion;
pub mod search;
pub mod store;

pub use cache::{Cache, CacheKey};
pub use completion::{CompletionOptions, CompletionProvider, CompletionStream};
pub use embedding::EmbeddingProvider;
pub use error::RagError;
pub use ingestion::{
    Chunk, ChunkContext, ChunkingConfig, ChunkingStrategy, ChunkingType, DocumentMetadata,
    DocumentParser, DocumentSection, IngestionConfig, IngestionReport, ParsedDocument,
    ParserContent, ParserInput, ParserType,
};
pub use search::SearchResult;
pub use store::{
    CandidateDocument, MetadataFilter, ScopeId, StoredChunk, VectorMatch, VectorStore,
};
