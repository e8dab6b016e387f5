//! Redis cache implementation

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::cache::Cache;
use crate::domain::RagError;

/// Configuration for the Redis cache
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
        }
    }
}

impl RedisCacheConfig {
    /// Create a configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// Redis-backed cache using a shared connection manager
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCache {
    /// Connect to Redis with the given configuration
    pub async fn new(config: RedisCacheConfig) -> Result<Self, RagError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| RagError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| RagError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    /// Connect with default configuration apart from the URL
    pub async fn with_url(url: impl Into<String>) -> Result<Self, RagError> {
        Self::new(RedisCacheConfig::new(url)).await
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RagError> {
        let prefixed = self.prefix_key(key);
        let mut conn = self.connection.clone();

        conn.get(&prefixed)
            .await
            .map_err(|e| RagError::cache(format!("Failed to get key '{}': {}", key, e)))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), RagError> {
        let prefixed = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let ttl_secs = ttl.as_secs().max(1);

        conn.set_ex(&prefixed, value, ttl_secs)
            .await
            .map_err(|e| RagError::cache(format!("Failed to set key '{}': {}", key, e)))
    }

    async fn delete(&self, key: &str) -> Result<bool, RagError> {
        let prefixed = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let deleted: u64 = conn
            .del(&prefixed)
            .await
            .map_err(|e| RagError::cache(format!("Failed to delete key '{}': {}", key, e)))?;

        Ok(deleted > 0)
    }
}
