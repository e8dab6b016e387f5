//! Cache key generation

use sha2::{Digest, Sha256};

/// Namespaced cache key builders.
///
/// Embedding keys hash the content, not its position, so identical text in
/// different documents shares one cache entry.
pub struct CacheKey;

impl CacheKey {
    /// Key for a cached embedding vector
    pub fn embedding(provider: &str, model: &str, text: &str) -> String {
        format!("emb:{}:{}:{}", provider, model, Self::content_hash(text))
    }

    /// Key for a per-document ingestion metadata record
    pub fn document(scope: &str, content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        format!("doc:{}:{}", scope, hex::encode(hasher.finalize()))
    }

    /// SHA-256 hex digest of a text
    pub fn content_hash(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_key_stable() {
        let a = CacheKey::embedding("openai", "text-embedding-3-small", "hello");
        let b = CacheKey::embedding("openai", "text-embedding-3-small", "hello");
        assert_eq!(a, b);
        assert!(a.starts_with("emb:openai:text-embedding-3-small:"));
    }

    #[test]
    fn test_embedding_key_content_sensitive() {
        let a = CacheKey::embedding("openai", "m", "hello");
        let b = CacheKey::embedding("openai", "m", "world");
        assert_ne!(a, b);
    }

    #[test]
    fn test_document_key() {
        let key = CacheKey::document("agent-1", b"file bytes");
        assert!(key.starts_with("doc:agent-1:"));
    }

    #[test]
    fn test_content_hash_is_hex_sha256() {
        let hash = CacheKey::content_hash("x");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
