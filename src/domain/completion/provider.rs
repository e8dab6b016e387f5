//! Completion provider trait definition

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::pin::Pin;

use crate::domain::RagError;

/// Stream of generated text fragments.
///
/// A failure partway through a stream surfaces as a terminal `Err` item;
/// fragments already yielded are never retried or rolled back.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, RagError>> + Send>>;

/// Options for a completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
            stop: Vec::new(),
        }
    }
}

impl CompletionOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Add a stop sequence
    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }
}

/// Trait for completion providers (OpenAI-compatible, Anthropic, etc.)
#[async_trait]
pub trait CompletionProvider: Send + Sync + Debug {
    /// Generate a completion for the given prompt
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, RagError>;

    /// Stream a completion for the given prompt
    async fn stream(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionStream, RagError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
