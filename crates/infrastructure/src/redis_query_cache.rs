//! Redis-backed query cache with tag sets.

use async_trait::async_trait;
use redis::AsyncCommands;
use rowguard_application::QueryCache;
use rowguard_core::{AppError, AppResult};

/// Redis implementation of the query cache port.
///
/// Values live under `{prefix}:value:{key}` with `SET EX`. Each tag is a set
/// `{prefix}:tag:{tag}` holding the value keys stored under it.
#[derive(Clone)]
pub struct RedisQueryCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisQueryCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn value_key(&self, key: &str) -> String {
        format!("{}:value:{key}", self.key_prefix)
    }

    fn tag_key(&self, tag: &str) -> String {
        format!("{}:tag:{tag}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl QueryCache for RedisQueryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut connection = self.connection().await?;

        connection
            .get(self.value_key(key))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read query cache entry '{key}': {error}"))
            })
    }

    async fn put(
        &self,
        key: &str,
        value: String,
        ttl_seconds: u32,
        tags: &[String],
    ) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        let value_key = self.value_key(key);
        let mut pipeline = redis::pipe();
        pipeline
            .atomic()
            .set_ex(&value_key, value, u64::from(ttl_seconds))
            .ignore();
        for tag in tags {
            let tag_key = self.tag_key(tag);
            // A tag set must outlive every value registered under it.
            pipeline
                .sadd(&tag_key, &value_key)
                .ignore()
                .cmd("EXPIRE")
                .arg(&tag_key)
                .arg(ttl_seconds)
                .arg("NX")
                .ignore()
                .cmd("EXPIRE")
                .arg(&tag_key)
                .arg(ttl_seconds)
                .arg("GT")
                .ignore();
        }

        let mut connection = self.connection().await?;
        pipeline
            .query_async::<()>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write query cache entry '{key}': {error}"))
            })
    }

    async fn invalidate_tags(&self, tags: &[String]) -> AppResult<u64> {
        let mut connection = self.connection().await?;
        let mut dropped = 0_u64;

        for tag in tags {
            let tag_key = self.tag_key(tag);
            let members: Vec<String> = connection.smembers(&tag_key).await.map_err(|error| {
                AppError::Internal(format!("failed to read query cache tag '{tag}': {error}"))
            })?;

            if !members.is_empty() {
                let deleted: u64 = connection.del(&members).await.map_err(|error| {
                    AppError::Internal(format!(
                        "failed to drop query cache entries of tag '{tag}': {error}"
                    ))
                })?;
                dropped += deleted;
            }

            connection.del::<_, ()>(&tag_key).await.map_err(|error| {
                AppError::Internal(format!("failed to drop query cache tag '{tag}': {error}"))
            })?;
        }

        Ok(dropped)
    }
}
