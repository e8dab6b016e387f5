//! ragcore
//!
//! Retrieval-augmented generation core: ingests heterogeneous documents,
//! splits them into token-bounded chunks, embeds and indexes them, and
//! answers queries through hybrid retrieval, re-ranking, and grounded
//! prompt construction over pluggable completion providers.
//!
//! The crate exposes three operations to surrounding systems, all on
//! [`RagEngine`]:
//! - `ingest(request)` - parse, chunk, embed, and persist one document
//! - `search(query, scope, k, filter)` - hybrid retrieval with re-ranking
//! - `answer(query, scope, history)` - retrieval-grounded generation
//!
//! Collaborators (vector store, cache, embedding and completion providers)
//! are injected as trait objects; nothing in here owns a global client.

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::RagConfig;
pub use domain::{
    Cache, Chunk, ChunkingConfig, ChunkingType, CompletionOptions, CompletionProvider,
    EmbeddingProvider, IngestionConfig, IngestionReport, MetadataFilter, ParsedDocument,
    ParserInput, ParserType, RagError, ScopeId, SearchResult, StoredChunk, VectorStore,
};
pub use infrastructure::services::{
    Answer, HistoryTurn, IngestRequest, IngestionPipeline, QueryConfig, QueryOrchestrator,
    RagEngine,
};
