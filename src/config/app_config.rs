//! Layered application configuration

use serde::{Deserialize, Serialize};

use crate::domain::RagError;

/// Chunking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingSettings {
    /// Maximum tokens per chunk
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Overlap between consecutive chunks in tokens
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
    /// Minimum tokens per chunk
    #[serde(default = "default_min_tokens")]
    pub min_tokens: usize,
}

fn default_max_tokens() -> usize {
    512
}

fn default_overlap_tokens() -> usize {
    128
}

fn default_min_tokens() -> usize {
    100
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            overlap_tokens: default_overlap_tokens(),
            min_tokens: default_min_tokens(),
        }
    }
}

/// Search and blending settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Weight of the vector similarity signal
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,
    /// Weight of the keyword signal
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,
    /// Default number of results
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Whether reranking is enabled
    #[serde(default = "default_true")]
    pub use_reranking: bool,
}

fn default_vector_weight() -> f32 {
    0.7
}

fn default_keyword_weight() -> f32 {
    0.3
}

fn default_top_k() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            vector_weight: default_vector_weight(),
            keyword_weight: default_keyword_weight(),
            top_k: default_top_k(),
            use_reranking: default_true(),
        }
    }
}

/// Ingestion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionSettings {
    /// Chunks embedded and persisted per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Content size in bytes above which chunking runs on a blocking worker
    #[serde(default = "default_blocking_threshold")]
    pub blocking_threshold_bytes: usize,
}

fn default_batch_size() -> usize {
    10
}

fn default_blocking_threshold() -> usize {
    64 * 1024
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            blocking_threshold_bytes: default_blocking_threshold(),
        }
    }
}

/// Provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Per-request timeout at the provider boundary, in seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Context budget for answer generation, in tokens
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_context_tokens() -> usize {
    3000
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout_secs(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

/// Application configuration, layered: built-in defaults, then an optional
/// `ragcore.toml`, then `RAGCORE__`-prefixed environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Chunking settings
    #[serde(default)]
    pub chunking: ChunkingSettings,
    /// Search settings
    #[serde(default)]
    pub search: SearchSettings,
    /// Ingestion settings
    #[serde(default)]
    pub ingestion: IngestionSettings,
    /// Provider settings
    #[serde(default)]
    pub providers: ProviderSettings,
}

impl RagConfig {
    /// Load configuration from `ragcore.toml` (optional) and environment
    /// variables (e.g., `RAGCORE_SEARCH__TOP_K=10`). A `.env` file is
    /// honored when present.
    pub fn load() -> Result<Self, RagError> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("ragcore").required(false))
            .add_source(config::Environment::with_prefix("RAGCORE").separator("__"))
            .build()
            .map_err(|e| RagError::configuration(format!("Failed to load config: {}", e)))?;

        settings
            .try_deserialize()
            .map_err(|e| RagError::configuration(format!("Invalid configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();

        assert_eq!(config.chunking.max_tokens, 512);
        assert_eq!(config.chunking.overlap_tokens, 128);
        assert_eq!(config.search.top_k, 5);
        assert!((config.search.vector_weight - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.ingestion.batch_size, 10);
        assert_eq!(config.providers.max_context_tokens, 3000);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: RagConfig =
            serde_json::from_str(r#"{ "search": { "top_k": 12 } }"#).unwrap();

        assert_eq!(config.search.top_k, 12);
        assert!((config.search.keyword_weight - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.chunking.max_tokens, 512);
    }

    #[test]
    fn test_roundtrip() {
        let config = RagConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RagConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.chunking.max_tokens, config.chunking.max_tokens);
        assert_eq!(parsed.search.top_k, config.search.top_k);
    }
}
