//! Hybrid search engine blending vector similarity and keyword scoring

use std::collections::HashMap;
use std::sync::Arc;

use super::bm25::Bm25Scorer;
use super::highlight::extract_highlights;
use super::text::tokenize;
use crate::domain::search::{sort_by_combined_score, SearchResult};
use crate::domain::store::{CandidateDocument, MetadataFilter, ScopeId, VectorStore};
use crate::domain::RagError;

/// Configuration for hybrid score blending
#[derive(Debug, Clone)]
pub struct HybridSearchConfig {
    /// Weight of the vector similarity signal
    pub vector_weight: f32,
    /// Weight of the keyword (BM25) signal
    pub keyword_weight: f32,
    /// Minimum vector similarity for a candidate to enter the pool
    pub similarity_threshold: f32,
}

impl Default for HybridSearchConfig {
    fn default() -> Self {
        Self {
            vector_weight: 0.7,
            keyword_weight: 0.3,
            similarity_threshold: 0.0,
        }
    }
}

impl HybridSearchConfig {
    /// Create a config with explicit weights; they are renormalized to sum
    /// to 1 if they do not already.
    pub fn new(vector_weight: f32, keyword_weight: f32) -> Self {
        let mut config = Self {
            vector_weight,
            keyword_weight,
            ..Default::default()
        };
        config.renormalize();
        config
    }

    /// Set the similarity threshold
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    fn renormalize(&mut self) {
        let total = self.vector_weight + self.keyword_weight;
        if total > 0.0 && (total - 1.0).abs() > f32::EPSILON {
            self.vector_weight /= total;
            self.keyword_weight /= total;
        }
    }
}

/// Retrieves vector and keyword candidates independently, normalizes each
/// score list by its own maximum, and blends them.
///
/// Either retrieval leg may fail on its own: the query degrades to the
/// surviving leg rather than failing outright. Only when both legs fail is
/// the error surfaced.
#[derive(Debug)]
pub struct HybridSearchEngine {
    store: Arc<dyn VectorStore>,
    scorer: Bm25Scorer,
    config: HybridSearchConfig,
}

impl HybridSearchEngine {
    /// Create an engine over a store with default blending
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            scorer: Bm25Scorer::new(),
            config: HybridSearchConfig::default(),
        }
    }

    /// Set the blend configuration
    pub fn with_config(mut self, config: HybridSearchConfig) -> Self {
        let mut config = config;
        config.renormalize();
        self.config = config;
        self
    }

    /// Search a scope. Fetches `2k` vector candidates and `3k` keyword
    /// candidates, blends, and returns the top `k`.
    pub async fn search(
        &self,
        query: &str,
        query_embedding: &[f32],
        scope: &ScopeId,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>, RagError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_tokens = tokenize(query);

        let vector_leg = self
            .store
            .similarity_search(
                scope,
                query_embedding,
                k * 2,
                self.config.similarity_threshold,
                filter,
            )
            .await;

        let keyword_leg = if query_tokens.is_empty() {
            Ok(Vec::new())
        } else {
            self.store
                .keyword_candidates(scope, &query_tokens, k * 3, filter)
                .await
        };

        let (vector_matches, keyword_pool) = match (vector_leg, keyword_leg) {
            (Ok(v), Ok(kw)) => (v, kw),
            (Ok(v), Err(e)) => {
                tracing::warn!(error = %e, "Keyword search failed, degrading to vector-only");
                (v, Vec::new())
            }
            (Err(e), Ok(kw)) => {
                tracing::warn!(error = %e, "Vector search failed, degrading to keyword-only");
                (Vec::new(), kw)
            }
            (Err(vector_err), Err(keyword_err)) => {
                return Err(RagError::persistence(format!(
                    "both search legs failed: vector: {}; keyword: {}",
                    vector_err, keyword_err
                )));
            }
        };

        let keyword_scores = self.scorer.score_pool(
            &query_tokens,
            &keyword_pool
                .iter()
                .map(|c| c.content.as_str())
                .collect::<Vec<_>>(),
        );

        let mut pool: HashMap<String, (CandidateDocument, f32, f32)> = HashMap::new();

        for m in vector_matches {
            pool.insert(m.document.id.clone(), (m.document, m.similarity, 0.0));
        }

        for (candidate, score) in keyword_pool.into_iter().zip(keyword_scores) {
            pool.entry(candidate.id.clone())
                .and_modify(|entry| entry.2 = score)
                .or_insert((candidate, 0.0, score));
        }

        let max_vector = pool
            .values()
            .map(|(_, v, _)| *v)
            .fold(0.0f32, f32::max)
            .max(f32::EPSILON);
        let max_keyword = pool
            .values()
            .map(|(_, _, kw)| *kw)
            .fold(0.0f32, f32::max)
            .max(f32::EPSILON);

        let mut results: Vec<SearchResult> = pool
            .into_values()
            .map(|(candidate, vector, keyword)| {
                let vector_score = vector / max_vector;
                let keyword_score = keyword / max_keyword;
                let combined = self.config.vector_weight * vector_score
                    + self.config.keyword_weight * keyword_score;

                SearchResult::new(candidate.id, candidate.content.clone())
                    .with_metadata(candidate.metadata)
                    .with_scores(vector_score, keyword_score, combined)
                    .with_highlights(extract_highlights(&candidate.content, &query_tokens))
            })
            .collect();

        sort_by_combined_score(&mut results);
        results.truncate(k);

        Ok(results)
    }
}
