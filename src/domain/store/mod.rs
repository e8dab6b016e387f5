//! Persistence abstraction for embedded chunks.
//!
//! The store is an external collaborator: this crate writes `StoredChunk`
//! records into it and queries candidates back out, with no client-side
//! transactional coupling between concurrent ingestion and query calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

use crate::domain::RagError;

/// Identifier scoping stored chunks to one tenant/agent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(String);

impl ScopeId {
    /// Create a scope id. Must be non-empty, at most 128 characters, and
    /// limited to alphanumerics, `-` and `_`.
    pub fn new(id: impl Into<String>) -> Result<Self, RagError> {
        let id = id.into();

        if id.is_empty() {
            return Err(RagError::validation("scope id must not be empty"));
        }

        if id.len() > 128 {
            return Err(RagError::validation("scope id must be at most 128 characters"));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(RagError::validation(
                "scope id may only contain alphanumerics, '-' and '_'",
            ));
        }

        Ok(Self(id))
    }

    /// Get the scope id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted form of a chunk: text, embedding, and flattened metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Record id (the chunk's UUID as a string)
    pub id: String,
    /// Chunk text
    pub content: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Combined chunk/document/custom metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl StoredChunk {
    /// Create a stored chunk record
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding,
            metadata: HashMap::new(),
        }
    }

    /// Set all metadata
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A candidate document returned from store queries (no scores attached)
#[derive(Debug, Clone)]
pub struct CandidateDocument {
    /// Record id
    pub id: String,
    /// Chunk text
    pub content: String,
    /// Stored metadata
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A candidate with its vector similarity
#[derive(Debug, Clone)]
pub struct VectorMatch {
    /// The candidate
    pub document: CandidateDocument,
    /// Cosine similarity in [0, 1]
    pub similarity: f32,
}

/// Equality filter over stored metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataFilter(HashMap<String, serde_json::Value>);

impl MetadataFilter {
    /// Create an empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a metadata key to equal the given value
    pub fn with_eq(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Check whether a metadata map satisfies the filter
    pub fn matches(&self, metadata: &HashMap<String, serde_json::Value>) -> bool {
        self.0
            .iter()
            .all(|(key, value)| metadata.get(key) == Some(value))
    }

    /// Check if the filter has no conditions
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Trait for vector-capable chunk stores
#[async_trait]
pub trait VectorStore: Send + Sync + Debug {
    /// Embedding dimension the store expects
    fn dimension(&self) -> usize;

    /// Persist a batch of chunks, returning their ids in order
    async fn add_chunks(
        &self,
        scope: &ScopeId,
        chunks: Vec<StoredChunk>,
    ) -> Result<Vec<String>, RagError>;

    /// Top-k candidates by vector similarity, highest first. Results below
    /// `threshold` are excluded.
    async fn similarity_search(
        &self,
        scope: &ScopeId,
        query_embedding: &[f32],
        k: usize,
        threshold: f32,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>, RagError>;

    /// Candidates containing any of the query tokens, for lexical scoring
    /// by the caller. Ranked by naive match count; the hybrid engine
    /// re-scores them with BM25 over the returned pool.
    async fn keyword_candidates(
        &self,
        scope: &ScopeId,
        tokens: &[String],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<CandidateDocument>, RagError>;

    /// Delete chunks by id, returning how many were removed
    async fn delete_chunks(&self, scope: &ScopeId, ids: &[String]) -> Result<usize, RagError>;
}
