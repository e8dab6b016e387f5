//! Re-ranking of blended search results

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt::Debug;

use super::text::tokenize;
use crate::domain::search::{sort_by_combined_score, SearchResult};
use crate::domain::RagError;

/// Trait for re-ranking strategies.
///
/// The default implementation scores cheap lexical/structural features; the
/// contract leaves room for a semantic cross-encoder behind the same seam.
#[async_trait]
pub trait Reranker: Send + Sync + Debug {
    /// Reorder results for a query, optionally truncating to `top_k`
    async fn rerank(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchResult>, RagError>;

    /// Get the strategy name
    fn name(&self) -> &'static str;
}

/// Weights for the feature-based reranker
#[derive(Debug, Clone)]
pub struct RerankConfig {
    /// Weight of the exact substring match feature
    pub exact_match_weight: f32,
    /// Weight of the query-token coverage feature
    pub coverage_weight: f32,
    /// Weight of the earliest-match position feature
    pub position_weight: f32,
    /// Weight of the length appropriateness feature
    pub length_weight: f32,
    /// Weight of the freshness feature
    pub freshness_weight: f32,
    /// Share of the incoming combined score in the final blend
    pub original_blend: f32,
    /// Share of the feature score in the final blend
    pub feature_blend: f32,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            exact_match_weight: 0.3,
            coverage_weight: 0.2,
            position_weight: 0.2,
            length_weight: 0.1,
            freshness_weight: 0.2,
            original_blend: 0.6,
            feature_blend: 0.4,
        }
    }
}

impl RerankConfig {
    /// Set the blend ratio between the incoming score and the feature score
    pub fn with_blend(mut self, original: f32, features: f32) -> Self {
        self.original_blend = original;
        self.feature_blend = features;
        self
    }
}

/// Feature-based reranker over five cheap signals: exact substring match,
/// query-token coverage, earliest match position, length appropriateness,
/// and freshness.
#[derive(Debug, Default)]
pub struct FeatureReranker {
    config: RerankConfig,
}

impl FeatureReranker {
    /// Create a reranker with default weights
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reranker with explicit weights
    pub fn with_config(config: RerankConfig) -> Self {
        Self { config }
    }

    fn exact_match(query: &str, content: &str) -> f32 {
        if content.to_lowercase().contains(&query.to_lowercase()) {
            1.0
        } else {
            0.0
        }
    }

    fn coverage(query_tokens: &HashSet<String>, content: &str) -> f32 {
        if query_tokens.is_empty() {
            return 0.0;
        }

        let content_lower = content.to_lowercase();
        let found = query_tokens
            .iter()
            .filter(|t| content_lower.contains(t.as_str()))
            .count();

        found as f32 / query_tokens.len() as f32
    }

    fn position(query_tokens: &HashSet<String>, content: &str) -> f32 {
        if query_tokens.is_empty() || content.is_empty() {
            return 0.0;
        }

        let content_lower = content.to_lowercase();
        let earliest = query_tokens
            .iter()
            .filter_map(|t| content_lower.find(t.as_str()))
            .min();

        match earliest {
            Some(position) => 1.0 - (position as f32 / content.len() as f32),
            None => 0.0,
        }
    }

    fn length(content: &str) -> f32 {
        let length = content.len();
        if length < 50 {
            0.5
        } else if length > 5000 {
            0.7
        } else {
            1.0
        }
    }

    /// Neutral 0.5 without a timestamp; decays from 1.0 toward 0.5 with age
    /// when `created_at` is present.
    fn freshness(result: &SearchResult) -> f32 {
        let created_at = result
            .metadata
            .get("document")
            .and_then(|d| d.get("created_at"))
            .or_else(|| result.metadata.get("created_at"))
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        match created_at {
            Some(created) => {
                let age_days = (Utc::now() - created).num_days().max(0) as f32;
                0.5 + 0.5 * (-age_days / 180.0).exp()
            }
            None => 0.5,
        }
    }
}

#[async_trait]
impl Reranker for FeatureReranker {
    async fn rerank(
        &self,
        query: &str,
        mut results: Vec<SearchResult>,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchResult>, RagError> {
        let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();

        for result in &mut results {
            let feature_score = self.config.exact_match_weight
                * Self::exact_match(query, &result.content)
                + self.config.coverage_weight * Self::coverage(&query_tokens, &result.content)
                + self.config.position_weight * Self::position(&query_tokens, &result.content)
                + self.config.length_weight * Self::length(&result.content)
                + self.config.freshness_weight * Self::freshness(result);

            result.combined_score = self.config.original_blend * result.combined_score
                + self.config.feature_blend * feature_score;
        }

        sort_by_combined_score(&mut results);

        if let Some(top_k) = top_k {
            results.truncate(top_k);
        }

        Ok(results)
    }

    fn name(&self) -> &'static str {
        "feature"
    }
}

/// Relevance reranker using Jaccard token overlap as a stand-in semantic
/// signal, blended 70/30 with the incoming combined score.
#[derive(Debug, Default)]
pub struct RelevanceReranker;

impl RelevanceReranker {
    /// Create a relevance reranker
    pub fn new() -> Self {
        Self
    }

    fn jaccard(query_tokens: &HashSet<String>, content: &str) -> f32 {
        let content_tokens: HashSet<String> = tokenize(content).into_iter().collect();

        if query_tokens.is_empty() && content_tokens.is_empty() {
            return 0.0;
        }

        let intersection = query_tokens.intersection(&content_tokens).count() as f32;
        let union = query_tokens.union(&content_tokens).count() as f32;

        if union == 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

#[async_trait]
impl Reranker for RelevanceReranker {
    async fn rerank(
        &self,
        query: &str,
        mut results: Vec<SearchResult>,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchResult>, RagError> {
        let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();

        for result in &mut results {
            let relevance = Self::jaccard(&query_tokens, &result.content);
            result.combined_score = 0.7 * result.combined_score + 0.3 * relevance;
        }

        sort_by_combined_score(&mut results);

        if let Some(top_k) = top_k {
            results.truncate(top_k);
        }

        Ok(results)
    }

    fn name(&self) -> &'static str {
        "relevance"
    }
}
