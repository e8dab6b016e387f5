//! OpenAI-compatible completion provider

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;

use crate::domain::completion::{CompletionOptions, CompletionProvider, CompletionStream};
use crate::domain::RagError;
use crate::infrastructure::http_client::HttpClientTrait;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Completion provider for any `/v1/chat/completions`-shaped endpoint
#[derive(Debug)]
pub struct OpenAiCompletionProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    model: String,
}

impl<C: HttpClientTrait> OpenAiCompletionProvider<C> {
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
        Self {
            client,
            auth_header: format!("Bearer {}", api_key.into()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
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
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
            "stream": stream,
        });

        if !options.stop.is_empty() {
            body["stop"] = serde_json::json!(options.stop);
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

        if data.trim() == "[DONE]" {
            break;
        }

        match serde_json::from_str::<StreamResponse>(data) {
            Ok(chunk) => {
                if let Some(choice) = chunk.choices.into_iter().next() {
                    if let Some(content) = choice.delta.content {
                        fragment.push_str(&content);
                    }
                }
            }
            Err(e) => {
                return Some(Err(RagError::provider(
                    "openai",
                    format!("Failed to parse stream chunk: {}", e),
                )));
            }
        }
    }

    (!fragment.is_empty()).then_some(Ok(fragment))
}

#[async_trait]
impl<C: HttpClientTrait> CompletionProvider for OpenAiCompletionProvider<C> {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, RagError> {
        let body = self.build_request(prompt, options, false);

        let json = self
            .client
            .post_json(&self.chat_completions_url(), self.headers(), &body)
            .await?;

        let response: ChatResponse = serde_json::from_value(json).map_err(|e| {
            RagError::provider("openai", format!("Failed to parse response: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RagError::provider("openai", "No choices in response"))?;

        Ok(choice.message.content.unwrap_or_default())
    }

    async fn stream(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionStream, RagError> {
        let body = self.build_request(prompt, options, true);

        let byte_stream = self
            .client
            .post_json_stream(&self.chat_completions_url(), self.headers(), &body)
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
        "openai"
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
