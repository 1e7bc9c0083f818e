use std::future::Future;
use std::sync::Arc;

use rowguard_core::{AppError, AppResult};
use rowguard_domain::{RecordType, UserId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::QueryCache;

/// Tag carried by every cached authorization result.
pub const AUTHORIZATION_CATALOG_TAG: &str = "authz:catalog";

/// Returns the tag carried by cached results of one principal.
#[must_use]
pub fn principal_tag(user_id: UserId) -> String {
    format!("authz:principal:{user_id}")
}

/// Returns the tag carried by cached reads of one record type.
#[must_use]
pub fn record_type_tag(record_type: &RecordType) -> String {
    format!("records:{record_type}")
}

/// Read-through wrapper around an optional [`QueryCache`].
///
/// Without a cache every call computes directly.
#[derive(Clone)]
pub struct QueryCacheService {
    cache: Option<Arc<dyn QueryCache>>,
    default_ttl_seconds: u32,
}

impl QueryCacheService {
    /// Creates a service backed by a cache adapter.
    #[must_use]
    pub fn new(cache: Arc<dyn QueryCache>, default_ttl_seconds: u32) -> Self {
        Self {
            cache: Some(cache),
            default_ttl_seconds,
        }
    }

    /// Creates a service that never caches.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            cache: None,
            default_ttl_seconds: 0,
        }
    }

    /// Returns the ttl used by services that do not pick their own.
    #[must_use]
    pub fn default_ttl_seconds(&self) -> u32 {
        self.default_ttl_seconds
    }

    /// Returns the cached value for `key` or computes, stores and returns it.
    ///
    /// Cache failures never fail the call: a broken read is a miss and a
    /// broken write only logs. A ttl of zero skips storing.
    pub async fn cached<T, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: u32,
        tags: &[String],
        compute: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let Some(cache) = self.cache.as_ref().filter(|_| ttl_seconds > 0) else {
            return compute().await;
        };

        match cache.get(key).await {
            Ok(Some(encoded)) => match serde_json::from_str::<T>(encoded.as_str()) {
                Ok(value) => {
                    debug!(cache.key = %key, "query cache hit");
                    return Ok(value);
                }
                Err(error) => {
                    warn!(cache.key = %key, error = %error, "discarding undecodable cache entry");
                }
            },
            Ok(None) => debug!(cache.key = %key, "query cache miss"),
            Err(error) => warn!(cache.key = %key, error = %error, "query cache read failed"),
        }

        let value = compute().await?;

        let encoded = serde_json::to_string(&value).map_err(|error| {
            AppError::Internal(format!("failed to encode cache entry '{key}': {error}"))
        })?;
        if let Err(error) = cache.put(key, encoded, ttl_seconds, tags).await {
            warn!(cache.key = %key, error = %error, "query cache write failed");
        }

        Ok(value)
    }

    /// Drops every cached entry carrying any of the tags.
    ///
    /// Failures are logged; stale entries then live until their ttl expires.
    pub async fn invalidate(&self, tags: &[String]) {
        let Some(cache) = &self.cache else {
            return;
        };

        match cache.invalidate_tags(tags).await {
            Ok(dropped) => debug!(tags = ?tags, dropped, "query cache tags invalidated"),
            Err(error) => warn!(tags = ?tags, error = %error, "query cache invalidation failed"),
        }
    }
}
