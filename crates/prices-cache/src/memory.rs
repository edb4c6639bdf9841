//! In-memory cache implementation.

use async_trait::async_trait;
use prices_core::{CachedResponse, HttpCache, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Simple in-memory cache for testing and development.
///
/// Responses are stored in a `RwLock`-protected `HashMap` and are lost when
/// the cache is dropped. Entries are cloned on get/put.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CachedResponse>>,
}

impl InMemoryCache {
    /// Create a new empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored responses.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl HttpCache for InMemoryCache {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>> {
        let cache = self.entries.read().await;
        match cache.get(key) {
            Some(entry) => {
                debug!("Cache hit");
                Ok(Some(entry.clone()))
            }
            None => {
                debug!("Cache miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, response), fields(status = response.status))]
    async fn put(&self, key: &str, response: &CachedResponse) -> Result<()> {
        let mut cache = self.entries.write().await;
        cache.insert(key.to_string(), response.clone());
        debug!("Cached response of {} bytes", response.body.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let mut cache = self.entries.write().await;
        let before = cache.len();
        cache.retain(|_, entry| !entry.is_expired(ttl));
        let removed = before - cache.len();

        if removed > 0 {
            debug!("Invalidated {} stale cache entries", removed);
        }

        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        debug!("Cleared all cache entries");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = InMemoryCache::new();
        let key = "GET https://api.eia.gov/v2/electricity/retail-sales/data?length=5000&offset=0";

        // Initially no data
        assert!(cache.get(key).await.unwrap().is_none());

        let response = CachedResponse::new(
            "https://api.eia.gov/v2/electricity/retail-sales/data",
            200,
            r#"{"response":{"total":0,"data":[]}}"#,
        );
        cache.put(key, &response).await.unwrap();

        let retrieved = cache.get(key).await.unwrap().unwrap();
        assert_eq!(retrieved, response);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_cache_invalidate_stale() {
        let cache = InMemoryCache::new();
        let fresh = CachedResponse::new("u", 200, "{}");
        let stale = CachedResponse {
            cached_at: Utc::now() - TimeDelta::days(2),
            ..fresh.clone()
        };
        cache.put("fresh", &fresh).await.unwrap();
        cache.put("stale", &stale).await.unwrap();

        let removed = cache
            .invalidate_stale(Duration::from_secs(24 * 3600))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(cache.get("fresh").await.unwrap().is_some());
        assert!(cache.get("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_clear() {
        let cache = InMemoryCache::new();
        cache
            .put("k", &CachedResponse::new("u", 200, "{}"))
            .await
            .unwrap();

        cache.clear().await.unwrap();

        assert!(cache.is_empty().await);
    }
}
