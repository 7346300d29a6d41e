/// Cache storage backends: in-process (moka) or shared (Redis)

use crate::error::Result;

use deadpool_redis::Pool;
use moka::future::Cache as MokaCache;
use moka::Expiry;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Entry bound for the in-process backend
pub const DEFAULT_LOCAL_CAPACITY: u64 = 10_000;

/// A cached JSON value with its time to live
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<serde_json::Value>,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(data: serde_json::Value, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            ttl,
        }
    }
}

/// Each entry lives for its own TTL, restarted when the key is overwritten
struct EntryExpiry;

impl Expiry<String, CachedEntry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &CachedEntry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Where cached values live.
///
/// Unlike a best-effort cache, every backend failure is returned to the
/// caller.
#[derive(Clone)]
pub enum CacheBackend {
    /// Single process: a bounded moka cache that evicts expired entries
    Local(MokaCache<String, CachedEntry>),

    /// Shared: entries live in Redis under an optional key prefix
    Redis { pool: Pool, prefix: Option<String> },
}

impl CacheBackend {
    pub fn new_local() -> Self {
        Self::new_local_with_capacity(DEFAULT_LOCAL_CAPACITY)
    }

    pub fn new_local_with_capacity(max_entries: u64) -> Self {
        CacheBackend::Local(
            MokaCache::builder()
                .max_capacity(max_entries)
                .expire_after(EntryExpiry)
                .build(),
        )
    }

    /// A prefix without a trailing `-` gets one appended
    pub fn new_redis(pool: Pool, prefix: Option<String>) -> Self {
        let prefix = prefix.filter(|p| !p.is_empty()).map(|mut p| {
            if !p.ends_with('-') {
                p.push('-');
            }
            p
        });
        CacheBackend::Redis { pool, prefix }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            CacheBackend::Local(_) => "local",
            CacheBackend::Redis { .. } => "redis",
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        match self {
            CacheBackend::Local(cache) => Ok(cache.get(key).await.map(|entry| (*entry.data).clone())),
            CacheBackend::Redis { pool, prefix } => {
                let mut conn = pool.get().await?;
                let raw: Option<String> = conn.get(with_prefix(prefix, key)).await?;
                match raw {
                    Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
                    None => Ok(None),
                }
            }
        }
    }

    pub async fn set(&self, key: &str, value: &serde_json::Value, ttl: Duration) -> Result<()> {
        match self {
            CacheBackend::Local(cache) => {
                cache
                    .insert(key.to_string(), CachedEntry::new(value.clone(), ttl))
                    .await;
                Ok(())
            }
            CacheBackend::Redis { pool, prefix } => {
                let mut conn = pool.get().await?;
                let payload = serde_json::to_string(value)?;
                let ttl_ms = ttl.as_millis().max(1) as u64;
                let _: () = redis::cmd("SET")
                    .arg(with_prefix(prefix, key))
                    .arg(payload)
                    .arg("PX")
                    .arg(ttl_ms)
                    .query_async(&mut conn)
                    .await?;
                Ok(())
            }
        }
    }

    /// Delete keys; a key may be given with or without the prefix
    pub async fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        match self {
            CacheBackend::Local(cache) => {
                let mut removed = 0;
                for key in keys {
                    if cache.remove(key.as_str()).await.is_some() {
                        removed += 1;
                    }
                }
                Ok(removed)
            }
            CacheBackend::Redis { pool, prefix } => {
                let mut conn = pool.get().await?;
                let full: Vec<String> = keys
                    .iter()
                    .map(|k| with_prefix(prefix, &strip_prefix(prefix, k.clone())))
                    .collect();
                let removed: u64 = conn.del(full).await?;
                Ok(removed)
            }
        }
    }

    /// Every live key matching a glob pattern (`*` and `?`), without prefix
    pub async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        match self {
            CacheBackend::Local(cache) => Ok(cache
                .iter()
                .filter(|(key, _)| glob_match(pattern, key))
                .map(|(key, _)| key.to_string())
                .collect()),
            CacheBackend::Redis { pool, prefix } => {
                let mut conn = pool.get().await?;
                let full_pattern = with_prefix(prefix, pattern);
                let mut cursor: u64 = 0;
                let mut keys = Vec::new();
                loop {
                    let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&full_pattern)
                        .query_async(&mut conn)
                        .await?;
                    keys.extend(batch.into_iter().map(|k| strip_prefix(prefix, k)));
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }
                Ok(keys)
            }
        }
    }
}

fn with_prefix(prefix: &Option<String>, key: &str) -> String {
    match prefix {
        Some(p) => format!("{}{}", p, key),
        None => key.to_string(),
    }
}

fn strip_prefix(prefix: &Option<String>, key: String) -> String {
    match prefix {
        Some(p) => key.strip_prefix(p.as_str()).map(str::to_string).unwrap_or(key),
        None => key,
    }
}

/// Redis-style glob: `*` matches any run, `?` a single character
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();

    let (mut p, mut c) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while c < candidate.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == candidate[c]) {
            p += 1;
            c += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, c));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            c = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&ch| ch == '*')
}
