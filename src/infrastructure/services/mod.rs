//! Composed pipelines: ingestion, query orchestration, and the facade

pub mod engine;
pub mod ingestion;
pub mod query;

pub use engine::RagEngine;
pub use ingestion::{IngestRequest, IngestionPipeline};
pub use query::{Answer, HistoryTurn, QueryConfig, QueryOrchestrator};
