//! Query orchestration: retrieval, context assembly, grounded generation

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::completion::{CompletionOptions, CompletionProvider};
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::ingestion::tokenizer::estimate_tokens;
use crate::domain::search::SearchResult;
use crate::domain::store::{MetadataFilter, ScopeId, VectorStore};
use crate::domain::RagError;
use crate::infrastructure::search::{
    FeatureReranker, HybridSearchConfig, HybridSearchEngine, Reranker,
};

const APOLOGY: &str =
    "I apologize, but I encountered an error processing your request. Please try again.";

/// Minimum context tokens worth including as a truncated tail
const MIN_TRUNCATED_TOKENS: usize = 50;

/// One prior conversation turn supplied by the caller
#[derive(Debug, Clone)]
pub struct HistoryTurn {
    /// "user" or "assistant"
    pub role: String,
    /// Turn text
    pub content: String,
}

impl HistoryTurn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A generated answer plus its provenance metadata
#[derive(Debug, Clone)]
pub struct Answer {
    /// Generated text (or the apology message on failure)
    pub content: String,
    /// Provenance: source ids, provider, context size, or error code
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Configuration for the query orchestrator
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Results returned by search and fed to context assembly
    pub top_k: usize,
    /// Context budget in tokens (estimated at ~4 chars/token)
    pub max_context_tokens: usize,
    /// Whether to rerank blended results
    pub use_reranking: bool,
    /// How many trailing history turns enter the prompt
    pub history_turns: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_context_tokens: 3000,
            use_reranking: true,
            history_turns: 5,
        }
    }
}

impl QueryConfig {
    /// Set the number of results
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the context token budget
    pub fn with_max_context_tokens(mut self, tokens: usize) -> Self {
        self.max_context_tokens = tokens;
        self
    }

    /// Enable or disable reranking
    pub fn with_reranking(mut self, enabled: bool) -> Self {
        self.use_reranking = enabled;
        self
    }
}

/// Per-request pipeline: embed the query, hybrid-retrieve, rerank, assemble
/// a token-bounded context, build a grounded prompt with numbered
/// citations, and complete.
///
/// `answer()` never propagates an error to the caller: any failure becomes
/// an apology message with an error code in the metadata.
#[derive(Debug)]
pub struct QueryOrchestrator {
    embedding: Arc<dyn EmbeddingProvider>,
    completion: Arc<dyn CompletionProvider>,
    engine: HybridSearchEngine,
    reranker: Arc<dyn Reranker>,
    config: QueryConfig,
    completion_options: CompletionOptions,
}

impl QueryOrchestrator {
    /// Create an orchestrator. Fails fast when the embedding dimension does
    /// not match what the store expects.
    pub fn new(
        embedding: Arc<dyn EmbeddingProvider>,
        completion: Arc<dyn CompletionProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self, RagError> {
        if embedding.dimension() != store.dimension() {
            return Err(RagError::configuration(format!(
                "embedding dimension {} does not match store dimension {}",
                embedding.dimension(),
                store.dimension()
            )));
        }

        Ok(Self {
            embedding,
            completion,
            engine: HybridSearchEngine::new(store),
            reranker: Arc::new(FeatureReranker::new()),
            config: QueryConfig::default(),
            completion_options: CompletionOptions::default(),
        })
    }

    /// Set the hybrid blend configuration
    pub fn with_search_config(mut self, config: HybridSearchConfig) -> Self {
        self.engine = self.engine.with_config(config);
        self
    }

    /// Swap the reranking strategy
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    /// Set the orchestrator configuration
    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the completion options
    pub fn with_completion_options(mut self, options: CompletionOptions) -> Self {
        self.completion_options = options;
        self
    }

    /// Hybrid search with reranking. Over-fetches `2k` candidates when
    /// reranking is enabled so the reranker has room to reorder.
    pub async fn search(
        &self,
        query: &str,
        scope: &ScopeId,
        k: Option<usize>,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>, RagError> {
        let k = k.unwrap_or(self.config.top_k);
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding.embed_one(query).await?;

        let fetch = if self.config.use_reranking { k * 2 } else { k };
        let results = self
            .engine
            .search(query, &query_embedding, scope, fetch, filter)
            .await?;

        if self.config.use_reranking {
            self.reranker.rerank(query, results, Some(k)).await
        } else {
            let mut results = results;
            results.truncate(k);
            Ok(results)
        }
    }

    /// Answer a query against a scope. Always returns an `Answer`; failures
    /// surface as an apology with the error code in metadata.
    pub async fn answer(&self, query: &str, scope: &ScopeId, history: &[HistoryTurn]) -> Answer {
        match self.answer_inner(query, scope, history).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!(scope = scope.as_str(), error = %e, "Answer generation failed");

                let mut metadata = HashMap::new();
                metadata.insert("error".to_string(), serde_json::json!(e.code()));
                metadata.insert("error_message".to_string(), serde_json::json!(e.to_string()));

                Answer {
                    content: APOLOGY.to_string(),
                    metadata,
                }
            }
        }
    }

    async fn answer_inner(
        &self,
        query: &str,
        scope: &ScopeId,
        history: &[HistoryTurn],
    ) -> Result<Answer, RagError> {
        let results = self.search(query, scope, None, None).await?;

        let context = self.build_context(&results);
        let prompt = self.build_prompt(query, &context, history);

        let content = self
            .completion
            .complete(&prompt, &self.completion_options)
            .await?;

        let source_ids: Vec<&str> = results
            .iter()
            .take(3)
            .map(|r| r.document_id.as_str())
            .collect();

        let mut metadata = HashMap::new();
        metadata.insert(
            "source_documents".to_string(),
            serde_json::json!(results.len()),
        );
        metadata.insert("source_ids".to_string(), serde_json::json!(source_ids));
        metadata.insert(
            "provider".to_string(),
            serde_json::json!(self.completion.provider_name()),
        );
        metadata.insert("search_method".to_string(), serde_json::json!("hybrid"));
        metadata.insert(
            "used_reranking".to_string(),
            serde_json::json!(self.config.use_reranking),
        );
        metadata.insert("context_length".to_string(), serde_json::json!(context.len()));

        Ok(Answer { content, metadata })
    }

    /// Greedily include top results until the token budget is exhausted.
    /// The last result that would partially fit is truncated rather than
    /// dropped, as long as a useful amount of budget remains.
    fn build_context(&self, results: &[SearchResult]) -> String {
        if results.is_empty() {
            return String::new();
        }

        let mut parts = Vec::new();
        let mut used_tokens = 0usize;

        for (i, result) in results.iter().enumerate() {
            let source_info = if let Some(section) = result.section_title() {
                format!(" (Section: {})", section)
            } else if let Some(title) = result.document_title() {
                format!(" (Document: {})", title)
            } else {
                String::new()
            };

            let entry = format!("[{}] {}{}\n", i + 1, result.content, source_info);
            let entry_tokens = estimate_tokens(&entry);

            if used_tokens + entry_tokens > self.config.max_context_tokens {
                let available = self.config.max_context_tokens - used_tokens;
                if available > MIN_TRUNCATED_TOKENS {
                    let truncated: String = entry.chars().take(available * 4).collect();
                    parts.push(format!("{}...\n", truncated.trim_end()));
                }
                break;
            }

            parts.push(entry);
            used_tokens += entry_tokens;
        }

        parts.join("\n")
    }

    fn build_prompt(&self, query: &str, context: &str, history: &[HistoryTurn]) -> String {
        let mut history_text = String::new();

        if !history.is_empty() {
            history_text.push_str("\n\nPrevious conversation:\n");

            let skip = history.len().saturating_sub(self.config.history_turns);
            for turn in &history[skip..] {
                let role = if turn.role.eq_ignore_ascii_case("assistant") {
                    "Assistant"
                } else {
                    "User"
                };
                history_text.push_str(&format!("{}: {}\n", role, turn.content));
            }
        }

        if context.is_empty() {
            format!(
                "You are a helpful assistant answering questions for this workspace.\
                 {}\n\nUser Question: {}\n\n\
                 Please provide a helpful response. Note that no source context is \
                 available for this query, so answer from general knowledge and say so.",
                history_text, query
            )
        } else {
            format!(
                "You are a helpful assistant answering questions for this workspace. \
                 Answer using the numbered context below and cite sources by their \
                 number [1], [2], etc.\n\nContext information:\n{}\n{}\n\
                 User Question: {}\n\n\
                 Please provide a helpful and accurate response based on the context \
                 provided. If the context doesn't contain relevant information, you \
                 can provide a general response but mention that it's not from the \
                 provided sources.",
                context, history_text, query
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::completion::provider::mock::MockCompletionProvider;
    use crate::domain::embedding::provider::mock::MockEmbeddingProvider;
    use crate::domain::store::StoredChunk;
    use crate::infrastructure::store::InMemoryVectorStore;

    fn scope() -> ScopeId {
        ScopeId::new("test-agent").unwrap()
    }

    async fn seeded_store(dimension: usize) -> Arc<InMemoryVectorStore> {
        let store = Arc::new(InMemoryVectorStore::new(dimension));
        let embedding = MockEmbeddingProvider::new(dimension);

        let docs = [
            ("doc-1", "Our pricing plans start at ten dollars per month."),
            ("doc-2", "Support is reachable by email around the clock."),
            ("doc-3", "Refunds are processed within five business days."),
        ];

        let chunks = docs
            .iter()
            .map(|(id, content)| {
                StoredChunk::new(*id, *content, embedding.vector_for(content))
            })
            .collect();

        store.add_chunks(&scope(), chunks).await.unwrap();
        store
    }

    fn orchestrator(
        store: Arc<InMemoryVectorStore>,
        completion: Arc<MockCompletionProvider>,
    ) -> QueryOrchestrator {
        let embedding = Arc::new(MockEmbeddingProvider::new(store.dimension()));
        QueryOrchestrator::new(embedding, completion, store).unwrap()
    }

    #[tokio::test]
    async fn test_answer_carries_sources_and_provider() {
        let store = seeded_store(16).await;
        let completion =
            Arc::new(MockCompletionProvider::new("mock-llm").with_response("Plans start at $10 [1]."));
        let orchestrator = orchestrator(store, completion);

        let answer = orchestrator
            .answer("pricing plans", &scope(), &[])
            .await;

        assert_eq!(answer.content, "Plans start at $10 [1].");
        assert_eq!(answer.metadata["provider"], "mock-llm");
        assert_eq!(answer.metadata["search_method"], "hybrid");
        assert_eq!(answer.metadata["used_reranking"], true);
        assert!(answer.metadata["source_documents"].as_u64().unwrap() >= 1);
        assert!(!answer.metadata["source_ids"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_answer_failure_returns_apology() {
        let store = seeded_store(16).await;
        let completion = Arc::new(MockCompletionProvider::new("mock-llm").with_error("overloaded"));
        let orchestrator = orchestrator(store, completion);

        let answer = orchestrator.answer("pricing", &scope(), &[]).await;

        assert_eq!(answer.content, APOLOGY);
        assert_eq!(answer.metadata["error"], "provider_unavailable");
    }

    #[tokio::test]
    async fn test_embedding_failure_also_apologizes() {
        let store = seeded_store(16).await;
        let embedding = Arc::new(MockEmbeddingProvider::new(16).with_error("embeddings down"));
        let completion = Arc::new(MockCompletionProvider::new("mock-llm").with_response("x"));
        let orchestrator = QueryOrchestrator::new(embedding, completion, store).unwrap();

        let answer = orchestrator.answer("pricing", &scope(), &[]).await;

        assert_eq!(answer.content, APOLOGY);
        assert!(answer.metadata.contains_key("error"));
    }

    #[tokio::test]
    async fn test_search_returns_ranked_results() {
        let store = seeded_store(16).await;
        let completion = Arc::new(MockCompletionProvider::new("mock-llm"));
        let orchestrator = orchestrator(store, completion);

        let results = orchestrator
            .search("pricing plans", &scope(), Some(2), None)
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert!(results.len() <= 2);
        assert_eq!(results[0].document_id, "doc-1");
    }

    #[tokio::test]
    async fn test_prompt_includes_recent_history_only() {
        let store = seeded_store(16).await;
        let completion = Arc::new(MockCompletionProvider::new("mock-llm"));
        let orchestrator = orchestrator(store, completion);

        let history: Vec<HistoryTurn> = (0..8)
            .map(|i| HistoryTurn::user(format!("question number {}", i)))
            .collect();

        let prompt = orchestrator.build_prompt("latest", "context", &history);

        assert!(!prompt.contains("question number 0"));
        assert!(!prompt.contains("question number 2"));
        assert!(prompt.contains("question number 3"));
        assert!(prompt.contains("question number 7"));
    }

    #[tokio::test]
    async fn test_prompt_without_context_admits_it() {
        let store = seeded_store(16).await;
        let completion = Arc::new(MockCompletionProvider::new("mock-llm"));
        let orchestrator = orchestrator(store, completion);

        let prompt = orchestrator.build_prompt("anything", "", &[]);

        assert!(prompt.contains("no source context"));
    }

    #[tokio::test]
    async fn test_context_respects_budget_and_truncates_tail() {
        let store = Arc::new(InMemoryVectorStore::new(4));
        let completion = Arc::new(MockCompletionProvider::new("mock-llm"));
        let orchestrator = orchestrator(store, completion)
            .with_config(QueryConfig::default().with_max_context_tokens(150));

        let results = vec![
            SearchResult::new("a", "alpha ".repeat(50)).with_scores(0.0, 0.0, 0.9),
            SearchResult::new("b", "beta ".repeat(200)).with_scores(0.0, 0.0, 0.8),
            SearchResult::new("c", "gamma ".repeat(200)).with_scores(0.0, 0.0, 0.7),
        ];

        let context = orchestrator.build_context(&results);

        assert!(context.contains("[1]"));
        // The second result is truncated into the remaining budget, not
        // dropped outright
        assert!(context.contains("[2]"));
        assert!(context.contains("..."));
        // The third never fits
        assert!(!context.contains("[3]"));
        assert!(estimate_tokens(&context) <= 160);
    }

    #[tokio::test]
    async fn test_context_includes_section_info() {
        let store = Arc::new(InMemoryVectorStore::new(4));
        let completion = Arc::new(MockCompletionProvider::new("mock-llm"));
        let orchestrator = orchestrator(store, completion);

        let mut metadata = HashMap::new();
        metadata.insert(
            "chunk".to_string(),
            serde_json::json!({ "section_title": "Pricing" }),
        );

        let results =
            vec![SearchResult::new("a", "plans info").with_metadata(metadata)];

        let context = orchestrator.build_context(&results);

        assert!(context.contains("(Section: Pricing)"));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = Arc::new(InMemoryVectorStore::new(8));
        let embedding = Arc::new(MockEmbeddingProvider::new(16));
        let completion = Arc::new(MockCompletionProvider::new("mock-llm"));

        let result = QueryOrchestrator::new(embedding, completion, store);

        assert!(matches!(result, Err(RagError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_reranking_disabled_skips_reranker() {
        let store = seeded_store(16).await;
        let completion = Arc::new(MockCompletionProvider::new("mock-llm"));
        let orchestrator = orchestrator(store, completion)
            .with_config(QueryConfig::default().with_reranking(false));

        let results = orchestrator
            .search("refunds", &scope(), Some(1), None)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
    }
}
