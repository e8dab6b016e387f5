//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::RagError;

/// Trait for embedding providers.
///
/// `dimension()` is fixed for the lifetime of a provider instance and must
/// match the persistence layer; services verify the two agree at
/// construction time.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Embed a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Embed a batch of texts. Providers with a native batch API should
    /// override this with a single call; the default embeds items
    /// concurrently (bounded by the caller's batch size) and fails if any
    /// item fails.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        futures::future::try_join_all(texts.iter().map(|text| self.embed_one(text))).await
    }

    /// Embedding vector dimension
    fn dimension(&self) -> usize;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock;

    /// Mock embedding provider producing deterministic vectors from a text
    /// hash, with call counting and configurable per-text failures.
    #[derive(Debug)]
    pub struct MockEmbeddingProvider {
        dimension: usize,
        fail_on: RwLock<Vec<String>>,
        fail_always: RwLock<Option<String>>,
        embed_one_calls: AtomicUsize,
        embed_many_calls: AtomicUsize,
    }

    impl MockEmbeddingProvider {
        pub fn new(dimension: usize) -> Self {
            Self {
                dimension,
                fail_on: RwLock::new(Vec::new()),
                fail_always: RwLock::new(None),
                embed_one_calls: AtomicUsize::new(0),
                embed_many_calls: AtomicUsize::new(0),
            }
        }

        /// Fail any call whose text contains the given fragment
        pub fn with_failure_on(self, fragment: impl Into<String>) -> Self {
            self.fail_on.write().unwrap().push(fragment.into());
            self
        }

        /// Fail every call with the given message
        pub fn with_error(self, message: impl Into<String>) -> Self {
            *self.fail_always.write().unwrap() = Some(message.into());
            self
        }

        pub fn embed_one_calls(&self) -> usize {
            self.embed_one_calls.load(Ordering::SeqCst)
        }

        pub fn embed_many_calls(&self) -> usize {
            self.embed_many_calls.load(Ordering::SeqCst)
        }

        pub fn total_calls(&self) -> usize {
            self.embed_one_calls() + self.embed_many_calls()
        }

        fn check(&self, text: &str) -> Result<(), RagError> {
            if let Some(ref message) = *self.fail_always.read().unwrap() {
                return Err(RagError::provider("mock-embedding", message.clone()));
            }

            for fragment in self.fail_on.read().unwrap().iter() {
                if text.contains(fragment.as_str()) {
                    return Err(RagError::provider(
                        "mock-embedding",
                        format!("configured failure on '{}'", fragment),
                    ));
                }
            }

            Ok(())
        }

        /// Deterministic vector derived from the text bytes
        pub fn vector_for(&self, text: &str) -> Vec<f32> {
            let hash = text.bytes().fold(0u64, |acc, b| {
                acc.wrapping_mul(31).wrapping_add(b as u64)
            });
            (0..self.dimension)
                .map(|i| ((hash.wrapping_add(i as u64) % 1000) as f32 / 1000.0) - 0.5)
                .collect()
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
            self.embed_one_calls.fetch_add(1, Ordering::SeqCst);
            self.check(text)?;
            Ok(self.vector_for(text))
        }

        async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            self.embed_many_calls.fetch_add(1, Ordering::SeqCst);

            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                self.check(text)?;
                out.push(self.vector_for(text));
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn provider_name(&self) -> &'static str {
            "mock-embedding"
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_deterministic_vectors() {
            let provider = MockEmbeddingProvider::new(64);

            let a = provider.embed_one("hello").await.unwrap();
            let b = provider.embed_one("hello").await.unwrap();

            assert_eq!(a, b);
            assert_eq!(a.len(), 64);
            assert_eq!(provider.embed_one_calls(), 2);
        }

        #[tokio::test]
        async fn test_batch_matches_single() {
            let provider = MockEmbeddingProvider::new(32);

            let single = provider.embed_one("text").await.unwrap();
            let batch = provider.embed_many(&["text".to_string()]).await.unwrap();

            assert_eq!(batch[0], single);
        }

        #[tokio::test]
        async fn test_configured_failure() {
            let provider = MockEmbeddingProvider::new(16).with_failure_on("poison");

            assert!(provider.embed_one("fine").await.is_ok());
            assert!(provider.embed_one("poison pill").await.is_err());

            let texts = vec!["ok".to_string(), "poison".to_string()];
            assert!(provider.embed_many(&texts).await.is_err());
        }
    }
}
