//! Anthropic completion provider

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;

use crate::domain::completion::{CompletionOptions, CompletionProvider, CompletionStream};
use crate::domain::RagError;
use crate::infrastructure::http_client::HttpClientTrait;

const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Completion provider for the Anthropic messages API
#[derive(Debug)]
pub struct AnthropicCompletionProvider<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
    model: String,
}

impl<C: HttpClientTrait> AnthropicCompletionProvider<C> {
    /// Create a new provider against the public Anthropic endpoint
    pub fn new(client: C, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, model, DEFAULT_ANTHROPIC_BASE_URL)
    }

    /// Create a new provider with a custom base URL
    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_VERSION),
            ("Content-Type", "application/json"),
        ]
    }

    fn build_request(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        stream: bool,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": stream,
        });

        if !options.stop.is_empty() {
            body["stop_sequences"] = serde_json::json!(options.stop);
        }

        body
    }
}

fn parse_sse_fragment(text: &str) -> Option<Result<String, RagError>> {
    let mut fragment = String::new();

    for line in text.lines() {
        let Some(data) = line.strip_prefix("data: ") else {
            continue;
        };

        match serde_json::from_str::<StreamEvent>(data) {
            Ok(event) => {
                if event.event_type == "content_block_delta" {
                    if let Some(delta) = event.delta {
                        if let Some(text) = delta.text {
                            fragment.push_str(&text);
                        }
                    }
                }
            }
            Err(e) => {
                return Some(Err(RagError::provider(
                    "anthropic",
                    format!("Failed to parse stream event: {}", e),
                )));
            }
        }
    }

    (!fragment.is_empty()).then_some(Ok(fragment))
}

#[async_trait]
impl<C: HttpClientTrait> CompletionProvider for AnthropicCompletionProvider<C> {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, RagError> {
        let body = self.build_request(prompt, options, false);

        let json = self
            .client
            .post_json(&self.messages_url(), self.headers(), &body)
            .await?;

        let response: MessagesResponse = serde_json::from_value(json).map_err(|e| {
            RagError::provider("anthropic", format!("Failed to parse response: {}", e))
        })?;

        let text = response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(RagError::provider("anthropic", "No text content in response"));
        }

        Ok(text)
    }

    async fn stream(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionStream, RagError> {
        let body = self.build_request(prompt, options, true);

        let byte_stream = self
            .client
            .post_json_stream(&self.messages_url(), self.headers(), &body)
            .await?;

        let stream = byte_stream.filter_map(|result| async move {
            match result {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    parse_sse_fragment(&text)
                }
                Err(e) => Some(Err(e)),
            }
        });

        Ok(Box::pin(stream))
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

// Anthropic API response types

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    text: Option<String>,
}
