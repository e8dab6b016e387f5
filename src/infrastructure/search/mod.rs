//! Hybrid retrieval: BM25 keyword scoring, vector blending, highlighting,
//! and re-ranking

pub mod bm25;
pub mod highlight;
pub mod hybrid;
pub mod rerank;
pub mod text;

pub use bm25::Bm25Scorer;
pub use highlight::extract_highlights;
pub use hybrid::{HybridSearchConfig, HybridSearchEngine};
pub use rerank::{FeatureReranker, RelevanceReranker, RerankConfig, Reranker};
pub use text::tokenize;
