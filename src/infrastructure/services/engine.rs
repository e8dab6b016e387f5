//! Top-level facade over the ingestion pipeline and query orchestrator

use std::sync::Arc;

use super::ingestion::{IngestRequest, IngestionPipeline};
use super::query::{Answer, HistoryTurn, QueryConfig, QueryOrchestrator};
use crate::config::RagConfig;
use crate::domain::cache::Cache;
use crate::domain::completion::CompletionProvider;
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::ingestion::{ChunkingConfig, IngestionConfig, IngestionReport};
use crate::domain::search::SearchResult;
use crate::domain::store::{MetadataFilter, ScopeId, VectorStore};
use crate::domain::RagError;
use crate::infrastructure::search::HybridSearchConfig;

/// The three operations surrounding systems call: `ingest`, `search`, and
/// `answer`. Everything else (routing, auth, transport) lives outside this
/// crate and composes over this facade.
#[derive(Debug)]
pub struct RagEngine {
    ingestion: IngestionPipeline,
    query: QueryOrchestrator,
}

impl RagEngine {
    /// Build an engine from its collaborators. Dimension agreement between
    /// the embedding provider and the store is checked here, at startup.
    pub fn new(
        embedding: Arc<dyn EmbeddingProvider>,
        completion: Arc<dyn CompletionProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self, RagError> {
        let ingestion = IngestionPipeline::new(embedding.clone(), store.clone())?;
        let query = QueryOrchestrator::new(embedding, completion, store)?;

        Ok(Self { ingestion, query })
    }

    /// Attach a cache used for ingestion records (and, when composed by the
    /// caller, embedding caching)
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.ingestion = self.ingestion.with_cache(cache);
        self
    }

    /// Set the default ingestion configuration
    pub fn with_ingestion_config(mut self, config: IngestionConfig) -> Self {
        self.ingestion = self.ingestion.with_config(config);
        self
    }

    /// Replace the query orchestrator (for custom rerankers or blends)
    pub fn with_query_orchestrator(mut self, query: QueryOrchestrator) -> Self {
        self.query = query;
        self
    }

    /// Apply loaded application settings across both pipelines
    pub fn with_settings(mut self, settings: &RagConfig) -> Self {
        let chunking = ChunkingConfig {
            max_tokens: settings.chunking.max_tokens,
            overlap_tokens: settings.chunking.overlap_tokens,
            min_tokens: settings.chunking.min_tokens,
        };

        let mut ingestion_config = IngestionConfig::new().with_batch_size(settings.ingestion.batch_size);
        ingestion_config.chunking = chunking;

        self.ingestion = self
            .ingestion
            .with_config(ingestion_config)
            .with_blocking_threshold(settings.ingestion.blocking_threshold_bytes);

        self.query = self
            .query
            .with_search_config(HybridSearchConfig::new(
                settings.search.vector_weight,
                settings.search.keyword_weight,
            ))
            .with_config(
                QueryConfig::default()
                    .with_top_k(settings.search.top_k)
                    .with_max_context_tokens(settings.providers.max_context_tokens)
                    .with_reranking(settings.search.use_reranking),
            );

        self
    }

    /// Ingest a document into a scope
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestionReport, RagError> {
        self.ingestion.ingest(request).await
    }

    /// Hybrid search within a scope
    pub async fn search(
        &self,
        query: &str,
        scope: &ScopeId,
        k: Option<usize>,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>, RagError> {
        self.query.search(query, scope, k, filter).await
    }

    /// Answer a query against a scope with optional conversation history
    pub async fn answer(&self, query: &str, scope: &ScopeId, history: &[HistoryTurn]) -> Answer {
        self.query.answer(query, scope, history).await
    }
}
