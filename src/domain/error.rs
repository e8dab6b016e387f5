use thiserror::Error;

use super::ingestion::IngestionReport;

/// Core errors for the RAG pipeline
#[derive(Debug, Error)]
pub enum RagError {
    #[error("Unsupported format: {message}")]
    UnsupportedFormat { message: String },

    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("All completion providers failed after {} attempts", failures.len())]
    AllProvidersFailed { failures: Vec<String> },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Ingestion completed with {} failed chunks", report.failed_chunks)]
    PartialIngestion { report: IngestionReport },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RagError {
    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            message: message.into(),
        }
    }

    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short machine-readable code for surfacing in response metadata
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::MalformedInput { .. } => "malformed_input",
            Self::Validation { .. } => "validation",
            Self::Configuration { .. } => "configuration",
            Self::Provider { .. } => "provider_unavailable",
            Self::AllProvidersFailed { .. } => "all_providers_failed",
            Self::Persistence { .. } => "persistence",
            Self::Cache { .. } => "cache",
            Self::PartialIngestion { .. } => "partial_ingestion",
            Self::Internal { .. } => "internal",
        }
    }
}
