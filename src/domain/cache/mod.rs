//! Cache abstraction.
//!
//! Cache access returns `Result`/`Option` values so callers can absorb
//! failures structurally; nothing in this crate treats a cache miss or a
//! cache error as fatal.

pub mod key;

pub use key::CacheKey;

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

use crate::domain::RagError;

/// Generic byte-value cache with per-entry TTL
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Get a value from the cache
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RagError>;

    /// Set a value in the cache with a TTL
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), RagError>;

    /// Delete a value from the cache, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, RagError>;
}
