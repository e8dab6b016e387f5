//! Fallback chain over completion providers

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::completion::{CompletionOptions, CompletionProvider, CompletionStream};
use crate::domain::RagError;

/// Tries an ordered list of providers until one succeeds.
///
/// The first provider is the primary; the rest are secondaries tried in
/// order. A stream, once obtained, never fails over mid-stream: fragments
/// already delivered stand, and a later stream error is terminal.
#[derive(Debug)]
pub struct FallbackCompletionProvider {
    providers: Vec<Arc<dyn CompletionProvider>>,
}

impl FallbackCompletionProvider {
    /// Create a fallback chain. The order of `providers` is the try order.
    pub fn new(providers: Vec<Arc<dyn CompletionProvider>>) -> Result<Self, RagError> {
        if providers.is_empty() {
            return Err(RagError::configuration(
                "fallback chain requires at least one completion provider",
            ));
        }

        Ok(Self { providers })
    }

    /// Create a chain from a primary and ordered secondaries
    pub fn with_primary(
        primary: Arc<dyn CompletionProvider>,
        secondaries: Vec<Arc<dyn CompletionProvider>>,
    ) -> Self {
        let mut providers = vec![primary];
        providers.extend(secondaries);
        Self { providers }
    }

    /// Run an attempt against each provider in order, collecting failures
    /// until one succeeds
    async fn try_in_order<'a, T, F, Fut>(&'a self, mut attempt: F) -> Result<T, RagError>
    where
        F: FnMut(&'a Arc<dyn CompletionProvider>) -> Fut,
        Fut: std::future::Future<Output = Result<T, RagError>>,
    {
        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match attempt(provider).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(
                        provider = provider.provider_name(),
                        error = %e,
                        "Completion provider failed, trying next"
                    );
                    failures.push(format!("{}: {}", provider.provider_name(), e));
                }
            }
        }

        Err(RagError::AllProvidersFailed { failures })
    }
}

#[async_trait]
impl CompletionProvider for FallbackCompletionProvider {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, RagError> {
        self.try_in_order(|provider| provider.complete(prompt, options))
            .await
    }

    async fn stream(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionStream, RagError> {
        self.try_in_order(|provider| provider.stream(prompt, options))
            .await
    }

    fn provider_name(&self) -> &'static str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::completion::provider::mock::MockCompletionProvider;

    #[tokio::test]
    async fn test_primary_success_skips_secondaries() {
        let primary = Arc::new(MockCompletionProvider::new("primary").with_response("from primary"));
        let secondary = Arc::new(MockCompletionProvider::new("secondary").with_response("unused"));

        let chain = FallbackCompletionProvider::with_primary(
            primary.clone(),
            vec![secondary.clone()],
        );

        let result = chain
            .complete("prompt", &CompletionOptions::default())
            .await
            .unwrap();

        assert_eq!(result, "from primary");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_through_to_working_secondary() {
        let primary = Arc::new(MockCompletionProvider::new("primary").with_error("down"));
        let broken = Arc::new(MockCompletionProvider::new("broken").with_error("also down"));
        let working = Arc::new(MockCompletionProvider::new("working").with_response("rescued"));

        let chain = FallbackCompletionProvider::with_primary(
            primary.clone(),
            vec![broken.clone(), working.clone()],
        );

        let result = chain
            .complete("prompt", &CompletionOptions::default())
            .await
            .unwrap();

        assert_eq!(result, "rescued");
        assert_eq!(primary.calls(), 1);
        assert_eq!(broken.calls(), 1);
        assert_eq!(working.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_failed() {
        let a = Arc::new(MockCompletionProvider::new("a").with_error("x"));
        let b = Arc::new(MockCompletionProvider::new("b").with_error("y"));

        let chain = FallbackCompletionProvider::with_primary(a, vec![b]);

        let result = chain
            .complete("prompt", &CompletionOptions::default())
            .await;

        match result {
            Err(RagError::AllProvidersFailed { failures }) => {
                assert_eq!(failures.len(), 2);
                assert!(failures[0].starts_with("a:"));
                assert!(failures[1].starts_with("b:"));
            }
            other => panic!("expected AllProvidersFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_obtained_from_fallback() {
        use futures::StreamExt;

        let primary = Arc::new(MockCompletionProvider::new("primary").with_error("down"));
        let secondary =
            Arc::new(MockCompletionProvider::new("secondary").with_response("streamed"));

        let chain = FallbackCompletionProvider::with_primary(primary, vec![secondary]);

        let mut stream = chain
            .stream("prompt", &CompletionOptions::default())
            .await
            .unwrap();

        let mut out = String::new();
        while let Some(fragment) = stream.next().await {
            out.push_str(&fragment.unwrap());
        }

        assert_eq!(out, "streamed");
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert!(FallbackCompletionProvider::new(Vec::new()).is_err());
    }
}
