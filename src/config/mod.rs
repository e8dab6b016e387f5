//! Application configuration

pub mod app_config;

pub use app_config::{
    ChunkingSettings, IngestionSettings, ProviderSettings, RagConfig, SearchSettings,
};
