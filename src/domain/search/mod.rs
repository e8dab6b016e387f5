//! Search result types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A ranked document returned by the hybrid search engine.
///
/// Scores are normalized against the candidate set of a single search
/// invocation; they are not comparable across calls and are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Stored chunk id
    pub document_id: String,
    /// Chunk text
    pub content: String,
    /// Stored metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Max-normalized vector similarity (0 when the document only matched
    /// the keyword leg)
    pub vector_score: f32,
    /// Max-normalized keyword score (0 when the document only matched the
    /// vector leg)
    pub keyword_score: f32,
    /// Weighted blend of the two, possibly adjusted by reranking
    pub combined_score: f32,
    /// Context windows around query-token matches
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl SearchResult {
    /// Create a search result
    pub fn new(document_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            content: content.into(),
            metadata: HashMap::new(),
            vector_score: 0.0,
            keyword_score: 0.0,
            combined_score: 0.0,
            highlights: Vec::new(),
        }
    }

    /// Set the score components
    pub fn with_scores(mut self, vector: f32, keyword: f32, combined: f32) -> Self {
        self.vector_score = vector;
        self.keyword_score = keyword;
        self.combined_score = combined;
        self
    }

    /// Set all metadata
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set highlights
    pub fn with_highlights(mut self, highlights: Vec<String>) -> Self {
        self.highlights = highlights;
        self
    }

    /// Section title recorded at ingestion time, if any
    pub fn section_title(&self) -> Option<&str> {
        self.metadata
            .get("chunk")
            .and_then(|c| c.get("section_title"))
            .and_then(|v| v.as_str())
    }

    /// Document title recorded at ingestion time, if any
    pub fn document_title(&self) -> Option<&str> {
        self.metadata
            .get("document")
            .and_then(|d| d.get("title"))
            .and_then(|v| v.as_str())
    }
}

/// Sort results by combined score, descending. NaN scores sink to the end.
pub fn sort_by_combined_score(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
