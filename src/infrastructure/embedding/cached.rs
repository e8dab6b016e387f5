//! Caching decorator for embedding providers

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::cache::{Cache, CacheKey};
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::RagError;

const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Wraps any embedding provider with a content-hash cache.
///
/// Keys hash the text itself, so identical text across different documents
/// shares one entry. The cache is best-effort: a read or write failure only
/// skips caching for that item and never fails the embedding call.
#[derive(Debug)]
pub struct CachedEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
    model_tag: String,
}

impl CachedEmbeddingProvider {
    /// Create a caching decorator around a provider
    pub fn new(inner: Arc<dyn EmbeddingProvider>, cache: Arc<dyn Cache>) -> Self {
        let model_tag = format!("d{}", inner.dimension());
        Self {
            inner,
            cache,
            ttl: DEFAULT_TTL,
            model_tag,
        }
    }

    /// Set the cache TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn key(&self, text: &str) -> String {
        CacheKey::embedding(self.inner.provider_name(), &self.model_tag, text)
    }

    async fn cache_get(&self, text: &str) -> Option<Vec<f32>> {
        let key = self.key(text);

        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<f32>>(&bytes) {
                Ok(vector) if vector.len() == self.inner.dimension() => Some(vector),
                Ok(_) => {
                    tracing::warn!(key = %key, "Cached embedding has stale dimension, ignoring");
                    None
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to decode cached embedding");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Embedding cache read failed");
                None
            }
        }
    }

    async fn cache_put(&self, text: &str, vector: &[f32]) {
        let key = self.key(text);

        let bytes = match serde_json::to_vec(vector) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to encode embedding for cache");
                return;
            }
        };

        if let Err(e) = self.cache.set(&key, &bytes, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "Embedding cache write failed");
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbeddingProvider {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        if let Some(vector) = self.cache_get(text).await {
            return Ok(vector);
        }

        let vector = self.inner.embed_one(text).await?;
        self.cache_put(text, &vector).await;

        Ok(vector)
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            match self.cache_get(text).await {
                Some(vector) => results.push(Some(vector)),
                None => {
                    results.push(None);
                    uncached_texts.push(text.clone());
                    uncached_indices.push(i);
                }
            }
        }

        if !uncached_texts.is_empty() {
            let fresh = self.inner.embed_many(&uncached_texts).await?;

            for (slot, vector) in uncached_indices.iter().zip(fresh) {
                self.cache_put(&texts[*slot], &vector).await;
                results[*slot] = Some(vector);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}
