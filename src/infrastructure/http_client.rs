//! HTTP client seam shared by the embedding and completion providers

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

use crate::domain::RagError;

/// Stream type for HTTP response bodies
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RagError>> + Send>>;

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, RagError>;

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<ByteStream, RagError>;
}

/// Real HTTP client using reqwest.
///
/// Provider-call timeouts are enforced here, at the request boundary.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, RagError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::provider("http", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(RagError::provider(
                "http",
                format!("HTTP {}: {}", status, error_body),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| RagError::provider("http", format!("Failed to parse response: {}", e)))
    }

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<ByteStream, RagError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::provider("http", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(RagError::provider(
                "http",
                format!("HTTP {}: {}", status, error_body),
            ));
        }

        use futures::StreamExt;
        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| RagError::provider("http", format!("Stream error: {}", e)))
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use futures::stream;
    use std::collections::HashMap;
    use std::sync::RwLock;

    #[derive(Debug)]
    pub struct MockHttpClient {
        responses: RwLock<HashMap<String, serde_json::Value>>,
        stream_responses: RwLock<HashMap<String, Vec<Bytes>>>,
        errors: RwLock<HashMap<String, String>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self {
                responses: RwLock::new(HashMap::new()),
                stream_responses: RwLock::new(HashMap::new()),
                errors: RwLock::new(HashMap::new()),
            }
        }

        pub fn with_response(self, url: impl Into<String>, response: serde_json::Value) -> Self {
            self.responses.write().unwrap().insert(url.into(), response);
            self
        }

        pub fn with_stream_response(self, url: impl Into<String>, chunks: Vec<Bytes>) -> Self {
            self.stream_responses
                .write()
                .unwrap()
                .insert(url.into(), chunks);
            self
        }

        pub fn with_error(self, url: impl Into<String>, error: impl Into<String>) -> Self {
            self.errors.write().unwrap().insert(url.into(), error.into());
            self
        }
    }

    impl Default for MockHttpClient {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl HttpClientTrait for MockHttpClient {
        async fn post_json(
            &self,
            url: &str,
            _headers: Vec<(&str, &str)>,
            _body: &serde_json::Value,
        ) -> Result<serde_json::Value, RagError> {
            if let Some(error) = self.errors.read().unwrap().get(url) {
                return Err(RagError::provider("mock", error.clone()));
            }

            self.responses
                .read()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| RagError::provider("mock", format!("No mock response for {}", url)))
        }

        async fn post_json_stream(
            &self,
            url: &str,
            _headers: Vec<(&str, &str)>,
            _body: &serde_json::Value,
        ) -> Result<ByteStream, RagError> {
            if let Some(error) = self.errors.read().unwrap().get(url) {
                return Err(RagError::provider("mock", error.clone()));
            }

            let chunks = self
                .stream_responses
                .read()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or_default();

            let stream = stream::iter(chunks.into_iter().map(Ok));
            Ok(Box::pin(stream))
        }
    }
}
