/// Result cache
///
/// `Cache` stores JSON values with a TTL in either a bounded in-process
/// cache or Redis. `get_or_set` coalesces concurrent misses for the same
/// key: the first caller computes the value and the others wait for it.

mod backend;

pub use backend::{glob_match, CacheBackend, CachedEntry, DEFAULT_LOCAL_CAPACITY};

use crate::config::CacheConfig;
use crate::error::{DistraughtError, Result};

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Default TTL when none is given: five minutes
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
pub struct Cache {
    backend: CacheBackend,
    in_flight: Arc<DashMap<String, Arc<OnceCell<serde_json::Value>>>>,
    default_ttl: Duration,
}

impl Cache {
    pub fn new(backend: CacheBackend) -> Self {
        Self {
            backend,
            in_flight: Arc::new(DashMap::new()),
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn local() -> Self {
        Self::new(CacheBackend::new_local())
    }

    /// Build from configuration; no URL means an in-process cache
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let backend = match &config.url {
            Some(url) => {
                let pool = deadpool_redis::Config::from_url(url.as_str())
                    .create_pool(Some(deadpool_redis::Runtime::Tokio1))
                    .map_err(|e| DistraughtError::Cache(format!("Failed to create Redis pool: {}", e)))?;
                CacheBackend::new_redis(pool, config.prefix.clone())
            }
            None => CacheBackend::new_local_with_capacity(config.max_entries),
        };

        tracing::info!("Cache backend: {}", backend.mode());

        Ok(Self::new(backend).with_default_ttl(Duration::from_millis(config.default_ttl_ms)))
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn backend(&self) -> &CacheBackend {
        &self.backend
    }

    pub async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        self.backend.get(key).await
    }

    /// Store `value` and hand it back
    pub async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<serde_json::Value> {
        self.backend
            .set(key, &value, ttl.unwrap_or(self.default_ttl))
            .await?;
        Ok(value)
    }

    /// Return the cached value for `key`, or run `produce`, store its value
    /// and return it. Producer and backend errors are returned, not
    /// swallowed, and nothing is stored on failure.
    pub async fn get_or_set<F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        produce: F,
    ) -> Result<serde_json::Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<serde_json::Value>>,
    {
        let cell = Arc::clone(
            &*self
                .in_flight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        );

        let result = cell
            .get_or_try_init(|| async {
                if let Some(hit) = self.get(key).await? {
                    tracing::debug!(key = %key, "cache hit");
                    return Ok(hit);
                }
                tracing::debug!(key = %key, "cache miss");
                let value = produce().await?;
                self.set(key, value, ttl).await
            })
            .await
            .cloned();

        self.in_flight.remove_if(key, |_, current| Arc::ptr_eq(current, &cell));

        result
    }

    /// Delete one or more keys, returning how many existed
    pub async fn invalidate(&self, keys: &[String]) -> Result<u64> {
        tracing::debug!(keys = ?keys, "cache invalidate");
        self.backend.delete(keys).await
    }

    /// Delete every key matching a glob pattern
    pub async fn invalidate_many(&self, pattern: &str) -> Result<u64> {
        let keys = self.scan(pattern).await?;
        tracing::debug!("Invalidating {} keys for pattern: {}", keys.len(), pattern);
        self.invalidate(&keys).await
    }

    pub async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        self.backend.scan(pattern).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_returns_value() {
        let cache = Cache::local();
        let stored = cache.set("a", json!({"n": 1}), None).await.unwrap();
        assert_eq!(stored, json!({"n": 1}));
        assert_eq!(cache.get("a").await.unwrap(), Some(json!({"n": 1})));
    }

    #[tokio::test]
    async fn test_get_or_set_miss_then_hit() {
        let cache = Cache::local();

        let first = cache
            .get_or_set("k", None, || async { Ok::<_, DistraughtError>(json!("computed")) })
            .await
            .unwrap();
        assert_eq!(first, json!("computed"));

        let second = cache
            .get_or_set("k", None, || async {
                Err::<serde_json::Value, _>(DistraughtError::Cache("producer must not run on a hit".into()))
            })
            .await
            .unwrap();
        assert_eq!(second, json!("computed"));
    }

    #[tokio::test]
    async fn test_producer_error_is_not_cached() {
        let cache = Cache::local();

        let failed = cache
            .get_or_set("k", None, || async { Err::<serde_json::Value, _>(DistraughtError::Cache("boom".into())) })
            .await;
        assert!(failed.is_err());
        assert_eq!(cache.get("k").await.unwrap(), None);

        let retried = cache
            .get_or_set("k", None, || async { Ok::<_, DistraughtError>(json!(2)) })
            .await
            .unwrap();
        assert_eq!(retried, json!(2));
    }

    #[tokio::test]
    async fn test_invalidate_many() {
        let cache = Cache::local();
        cache.set("user-1", json!(1), None).await.unwrap();
        cache.set("user-2", json!(2), None).await.unwrap();
        cache.set("order-1", json!(3), None).await.unwrap();

        let removed = cache.invalidate_many("user-*").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.scan("*").await.unwrap(), vec!["order-1".to_string()]);
    }
}
