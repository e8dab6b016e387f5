//! Embedding provider implementations

pub mod cached;
pub mod openai;

pub use cached::CachedEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;
