use async_trait::async_trait;
use rowguard_core::AppResult;

/// Tag-aware key/value cache for serialized query results.
#[async_trait]
pub trait QueryCache: Send + Sync {
    /// Returns the cached value for a key, if present and not expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Stores a value with ttl and registers the key under every tag.
    async fn put(
        &self,
        key: &str,
        value: String,
        ttl_seconds: u32,
        tags: &[String],
    ) -> AppResult<()>;

    /// Drops every key registered under any of the tags. Returns the number
    /// of dropped keys.
    async fn invalidate_tags(&self, tags: &[String]) -> AppResult<u64>;
}
