//! OpenAI-compatible embedding provider

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::embedding::EmbeddingProvider;
use crate::domain::RagError;
use crate::infrastructure::http_client::HttpClientTrait;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Known OpenAI embedding models and their dimensions
const EMBEDDING_MODELS: &[(&str, usize)] = &[
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
];

const DEFAULT_DIMENSION: usize = 1536;

/// Embedding provider for any `/v1/embeddings`-shaped endpoint.
///
/// The dimension is resolved once at construction (model table or explicit
/// override) and never changes for the life of the instance.
#[derive(Debug)]
pub struct OpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    model: String,
    dimension: usize,
}

impl<C: HttpClientTrait> OpenAiEmbeddingProvider<C> {
    /// Create a new provider against the public OpenAI endpoint
    pub fn new(client: C, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, model, DEFAULT_OPENAI_BASE_URL)
    }

    /// Create a new provider with a custom base URL
    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let model = model.into();
        let dimension = EMBEDDING_MODELS
            .iter()
            .find(|(name, _)| *name == model)
            .map(|(_, dims)| *dims)
            .unwrap_or(DEFAULT_DIMENSION);

        Self {
            client,
            auth_header: format!("Bearer {}", api_key.into()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model,
            dimension,
        }
    }

    /// Override the embedding dimension (for models outside the known table)
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    async fn request(&self, input: serde_json::Value) -> Result<Vec<Vec<f32>>, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": input,
        });

        let json = self
            .client
            .post_json(&self.embeddings_url(), self.headers(), &body)
            .await?;

        let response: EmbeddingsResponse = serde_json::from_value(json).map_err(|e| {
            RagError::provider("openai", format!("Failed to parse embedding response: {}", e))
        })?;

        let mut data = response.data;
        data.sort_by_key(|d| d.index);

        for item in &data {
            if item.embedding.len() != self.dimension {
                return Err(RagError::provider(
                    "openai",
                    format!(
                        "embedding dimension {} does not match configured {}",
                        item.embedding.len(),
                        self.dimension
                    ),
                ));
            }
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OpenAiEmbeddingProvider<C> {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.request(serde_json::json!(text)).await?;

        vectors
            .pop()
            .ok_or_else(|| RagError::provider("openai", "empty embedding response"))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.request(serde_json::json!(texts)).await?;

        if vectors.len() != texts.len() {
            return Err(RagError::provider(
                "openai",
                format!("expected {} embeddings, got {}", texts.len(), vectors.len()),
            ));
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.openai.com/v1/embeddings";

    fn mock_response(count: usize, dimension: usize) -> serde_json::Value {
        let data: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                let embedding: Vec<f32> =
                    (0..dimension).map(|j| (i + j) as f32 * 0.001).collect();
                serde_json::json!({ "index": i, "embedding": embedding })
            })
            .collect();

        serde_json::json!({ "model": "text-embedding-3-small", "data": data })
    }

    #[tokio::test]
    async fn test_embed_one() {
        let client = MockHttpClient::new().with_response(TEST_URL, mock_response(1, 1536));
        let provider = OpenAiEmbeddingProvider::new(client, "key", "text-embedding-3-small");

        let vector = provider.embed_one("Hello world").await.unwrap();

        assert_eq!(vector.len(), 1536);
    }

    #[tokio::test]
    async fn test_embed_many_single_call() {
        let client = MockHttpClient::new().with_response(TEST_URL, mock_response(3, 1536));
        let provider = OpenAiEmbeddingProvider::new(client, "key", "text-embedding-3-small");

        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let vectors = provider.embed_many(&texts).await.unwrap();

        assert_eq!(vectors.len(), 3);
    }

    #[tokio::test]
    async fn test_embed_many_empty_skips_request() {
        let client = MockHttpClient::new();
        let provider = OpenAiEmbeddingProvider::new(client, "key", "text-embedding-3-small");

        let vectors = provider.embed_many(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let client = MockHttpClient::new().with_response(TEST_URL, mock_response(1, 64));
        let provider = OpenAiEmbeddingProvider::new(client, "key", "text-embedding-3-small");

        let result = provider.embed_one("Hello").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let client = MockHttpClient::new().with_error(TEST_URL, "rate limited");
        let provider = OpenAiEmbeddingProvider::new(client, "key", "text-embedding-3-small");

        let result = provider.embed_one("Hello").await;
        assert!(matches!(result, Err(RagError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_custom_base_url() {
        let url = "http://localhost:8080/v1/embeddings";
        let client = MockHttpClient::new().with_response(url, mock_response(1, 1536));
        let provider = OpenAiEmbeddingProvider::with_base_url(
            client,
            "key",
            "text-embedding-3-small",
            "http://localhost:8080",
        );

        let vector = provider.embed_one("Test").await.unwrap();
        assert_eq!(vector.len(), 1536);
    }

    #[test]
    fn test_dimension_table_and_override() {
        let provider =
            OpenAiEmbeddingProvider::new(MockHttpClient::new(), "key", "text-embedding-3-large");
        assert_eq!(provider.dimension(), 3072);

        let provider =
            OpenAiEmbeddingProvider::new(MockHttpClient::new(), "key", "custom-model")
                .with_dimension(768);
        assert_eq!(provider.dimension(), 768);
    }
}
