//! In-memory vector store for development and testing

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::store::{
    CandidateDocument, MetadataFilter, ScopeId, StoredChunk, VectorMatch, VectorStore,
};
use crate::domain::RagError;

/// In-memory reference implementation of the chunk store.
///
/// Vector search is exact cosine similarity over all chunks in the scope;
/// keyword candidates are ranked by naive token match count, leaving BM25
/// scoring to the search engine.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimension: usize,
    entries: Arc<RwLock<Vec<Entry>>>,
}

#[derive(Debug, Clone)]
struct Entry {
    scope: String,
    chunk: StoredChunk,
}

impl InMemoryVectorStore {
    /// Create a store expecting embeddings of the given dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Number of chunks stored across all scopes
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }

    fn matches(
        entry: &Entry,
        scope: &ScopeId,
        filter: Option<&MetadataFilter>,
    ) -> bool {
        entry.scope == scope.as_str()
            && filter.map(|f| f.matches(&entry.chunk.metadata)).unwrap_or(true)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn add_chunks(
        &self,
        scope: &ScopeId,
        chunks: Vec<StoredChunk>,
    ) -> Result<Vec<String>, RagError> {
        for chunk in &chunks {
            if chunk.embedding.len() != self.dimension {
                return Err(RagError::persistence(format!(
                    "chunk '{}' has embedding dimension {}, store expects {}",
                    chunk.id,
                    chunk.embedding.len(),
                    self.dimension
                )));
            }
        }

        let mut entries = self.entries.write().await;
        let mut ids = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            ids.push(chunk.id.clone());
            entries.push(Entry {
                scope: scope.as_str().to_string(),
                chunk,
            });
        }

        Ok(ids)
    }

    async fn similarity_search(
        &self,
        scope: &ScopeId,
        query_embedding: &[f32],
        k: usize,
        threshold: f32,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>, RagError> {
        if query_embedding.len() != self.dimension {
            return Err(RagError::persistence(format!(
                "query embedding dimension {} does not match store dimension {}",
                query_embedding.len(),
                self.dimension
            )));
        }

        let entries = self.entries.read().await;

        let mut matches: Vec<VectorMatch> = entries
            .iter()
            .filter(|entry| Self::matches(entry, scope, filter))
            .map(|entry| VectorMatch {
                similarity: Self::cosine_similarity(query_embedding, &entry.chunk.embedding),
                document: CandidateDocument {
                    id: entry.chunk.id.clone(),
                    content: entry.chunk.content.clone(),
                    metadata: entry.chunk.metadata.clone(),
                },
            })
            .filter(|m| m.similarity >= threshold)
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(k);

        Ok(matches)
    }

    async fn keyword_candidates(
        &self,
        scope: &ScopeId,
        tokens: &[String],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<CandidateDocument>, RagError> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.entries.read().await;

        let mut scored: Vec<(usize, CandidateDocument)> = entries
            .iter()
            .filter(|entry| Self::matches(entry, scope, filter))
            .filter_map(|entry| {
                let content_lower = entry.chunk.content.to_lowercase();
                let match_count = tokens
                    .iter()
                    .filter(|t| content_lower.contains(t.as_str()))
                    .count();

                (match_count > 0).then(|| {
                    (
                        match_count,
                        CandidateDocument {
                            id: entry.chunk.id.clone(),
                            content: entry.chunk.content.clone(),
                            metadata: entry.chunk.metadata.clone(),
                        },
                    )
                })
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, c)| c).collect())
    }

    async fn delete_chunks(&self, scope: &ScopeId, ids: &[String]) -> Result<usize, RagError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();

        entries.retain(|entry| {
            entry.scope != scope.as_str() || !ids.contains(&entry.chunk.id)
        });

        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn scope(name: &str) -> ScopeId {
        ScopeId::new(name).unwrap()
    }

    fn chunk(id: &str, content: &str, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk::new(id, content, embedding)
    }

    #[tokio::test]
    async fn test_add_and_count() {
        let store = InMemoryVectorStore::new(3);

        let ids = store
            .add_chunks(
                &scope("s"),
                vec![
                    chunk("a", "first", vec![1.0, 0.0, 0.0]),
                    chunk("b", "second", vec![0.0, 1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_rejects_wrong_dimension() {
        let store = InMemoryVectorStore::new(3);

        let result = store
            .add_chunks(&scope("s"), vec![chunk("a", "x", vec![1.0, 0.0])])
            .await;

        assert!(matches!(result, Err(RagError::Persistence { .. })));
    }

    #[tokio::test]
    async fn test_similarity_orders_by_cosine() {
        let store = InMemoryVectorStore::new(2);

        store
            .add_chunks(
                &scope("s"),
                vec![
                    chunk("aligned", "a", vec![1.0, 0.0]),
                    chunk("diagonal", "b", vec![0.7, 0.7]),
                    chunk("orthogonal", "c", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let matches = store
            .similarity_search(&scope("s"), &[1.0, 0.0], 10, 0.0, None)
            .await
            .unwrap();

        assert_eq!(matches[0].document.id, "aligned");
        assert_eq!(matches[1].document.id, "diagonal");
        assert!((matches[0].similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_similarity_threshold_filters() {
        let store = InMemoryVectorStore::new(2);

        store
            .add_chunks(
                &scope("s"),
                vec![
                    chunk("near", "a", vec![1.0, 0.0]),
                    chunk("far", "b", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let matches = store
            .similarity_search(&scope("s"), &[1.0, 0.0], 10, 0.5, None)
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].document.id, "near");
    }

    #[tokio::test]
    async fn test_scope_isolation() {
        let store = InMemoryVectorStore::new(2);

        store
            .add_chunks(&scope("tenant-a"), vec![chunk("a", "x", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .add_chunks(&scope("tenant-b"), vec![chunk("b", "y", vec![1.0, 0.0])])
            .await
            .unwrap();

        let matches = store
            .similarity_search(&scope("tenant-a"), &[1.0, 0.0], 10, 0.0, None)
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].document.id, "a");
    }

    #[tokio::test]
    async fn test_keyword_candidates_ranked_by_matches() {
        let store = InMemoryVectorStore::new(2);

        store
            .add_chunks(
                &scope("s"),
                vec![
                    chunk("both", "pricing and plans discussed", vec![1.0, 0.0]),
                    chunk("one", "pricing only mentioned", vec![0.0, 1.0]),
                    chunk("none", "nothing relevant", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let candidates = store
            .keyword_candidates(
                &scope("s"),
                &["pricing".to_string(), "plans".to_string()],
                10,
                None,
            )
            .await
            .unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, "both");
    }

    #[tokio::test]
    async fn test_metadata_filter_applies() {
        let store = InMemoryVectorStore::new(2);

        let mut metadata = HashMap::new();
        metadata.insert("source_id".to_string(), serde_json::json!("faq"));

        store
            .add_chunks(
                &scope("s"),
                vec![
                    chunk("tagged", "pricing info", vec![1.0, 0.0]).with_metadata(metadata),
                    chunk("untagged", "pricing info", vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let filter = MetadataFilter::new().with_eq("source_id", serde_json::json!("faq"));

        let matches = store
            .similarity_search(&scope("s"), &[1.0, 0.0], 10, 0.0, Some(&filter))
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].document.id, "tagged");
    }

    #[tokio::test]
    async fn test_delete_chunks() {
        let store = InMemoryVectorStore::new(2);

        store
            .add_chunks(
                &scope("s"),
                vec![
                    chunk("keep", "x", vec![1.0, 0.0]),
                    chunk("drop", "y", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let deleted = store
            .delete_chunks(&scope("s"), &["drop".to_string(), "missing".to_string()])
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_query_dimension_checked() {
        let store = InMemoryVectorStore::new(3);

        let result = store
            .similarity_search(&scope("s"), &[1.0, 0.0], 10, 0.0, None)
            .await;

        assert!(result.is_err());
    }
}
