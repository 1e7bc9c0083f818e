use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rowguard_application::QueryCache;
use rowguard_core::AppResult;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct QueryCacheEntry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct QueryCacheState {
    entries: HashMap<String, QueryCacheEntry>,
    tags: HashMap<String, HashSet<String>>,
}

impl QueryCacheState {
    /// Drops expired entries and tag memberships pointing at missing keys.
    fn prune_expired(&mut self, now: Instant) {
        self.entries.retain(|_, entry| entry.expires_at > now);

        let entries = &self.entries;
        self.tags.retain(|_, keys| {
            keys.retain(|key| entries.contains_key(key));
            !keys.is_empty()
        });
    }
}

/// In-memory query cache adapter for single-process deployments and tests.
#[derive(Default)]
pub struct InMemoryQueryCache {
    state: RwLock<QueryCacheState>,
}

impl InMemoryQueryCache {
    /// Creates an empty in-memory query cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueryCache for InMemoryQueryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        {
            let state = self.state.read().await;
            match state.entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut state = self.state.write().await;
        if state
            .entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            state.entries.remove(key);
        }

        Ok(None)
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

        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(u64::from(ttl_seconds)))
            .unwrap_or(now);

        let mut state = self.state.write().await;
        state.prune_expired(now);
        state
            .entries
            .insert(key.to_owned(), QueryCacheEntry { value, expires_at });
        for tag in tags {
            state
                .tags
                .entry(tag.clone())
                .or_default()
                .insert(key.to_owned());
        }

        Ok(())
    }

    async fn invalidate_tags(&self, tags: &[String]) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let mut dropped = 0_u64;

        for tag in tags {
            let Some(keys) = state.tags.remove(tag) else {
                continue;
            };
            for key in keys {
                if state.entries.remove(&key).is_some() {
                    dropped += 1;
                }
            }
        }

        Ok(dropped)
    }
}
