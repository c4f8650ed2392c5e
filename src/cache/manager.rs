/// Generic in-memory cache with TTL and LRU eviction
///
/// Thread-safe, generic over the value type, keyed by strings.
/// Tracks metrics for monitoring.
use super::config::CacheConfig;
use crate::logger::{self, LogTag};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Cache entry with TTL tracking
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    last_accessed: Instant,
    /// Tie-breaker for entries touched within the same clock tick
    access_seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub inserts: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    access_seq: u64,
    metrics: CacheMetrics,
}

impl<V> CacheInner<V> {
    fn next_seq(&mut self) -> u64 {
        self.access_seq += 1;
        self.access_seq
    }

    fn evict_lru(&mut self) -> Option<String> {
        let lru_key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.last_accessed, entry.access_seq))
            .map(|(key, _)| key.clone())?;

        self.entries.remove(&lru_key);
        self.metrics.evictions += 1;
        Some(lru_key)
    }
}

/// Key/value store with per-entry TTL and bounded size
///
/// Reads past expiry are misses and evict the entry, so correctness never
/// depends on the background sweep. The lock is never held across an await.
pub struct CacheStore<V> {
    name: String,
    config: CacheConfig,
    inner: Mutex<CacheInner<V>>,
}

impl<V: Clone> CacheStore<V> {
    pub fn new(name: impl Into<String>, config: CacheConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                access_seq: 0,
                metrics: CacheMetrics::default(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get value from cache (None if expired or missing)
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let seq = inner.next_seq();

        match inner.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.last_accessed = now;
                entry.access_seq = seq;
                inner.metrics.hits += 1;
                return Some(entry.value.clone());
            }
            Some(_) => {
                inner.entries.remove(key);
                inner.metrics.expirations += 1;
            }
            None => {}
        }

        inner.metrics.misses += 1;
        None
    }

    /// Whether a fresh entry exists (does not count as an access)
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return false,
        };

        if expired {
            inner.entries.remove(key);
            inner.metrics.expirations += 1;
        }
        !expired
    }

    /// Insert value (evicts the least recently accessed entry when full)
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.config.capacity {
            if let Some(evicted) = inner.evict_lru() {
                logger::verbose(
                    LogTag::Cache,
                    &format!("[{}] evicted least recently used key {}", self.name, evicted),
                );
            }
        }

        let seq = inner.next_seq();
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + self.config.ttl,
                last_accessed: now,
                access_seq: seq,
            },
        );
        inner.metrics.inserts += 1;
    }

    /// Remove a key; returns whether it was present
    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.inner.lock().metrics.clone()
    }

    /// Remove every expired entry; returns how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - inner.entries.len();
        inner.metrics.expirations += removed as u64;
        removed
    }

    /// Return the cached value if fresh, else run `producer`, cache and return its result
    ///
    /// Failed producers are not cached. Two concurrent misses on the same key may
    /// both run their producer; the later write wins.
    pub async fn get_or_set<F, Fut, E>(&self, key: &str, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            logger::debug(LogTag::Cache, &format!("[{}] hit {}", self.name, key));
            return Ok(value);
        }

        logger::debug(LogTag::Cache, &format!("[{}] miss {}", self.name, key));
        let value = producer().await?;
        self.set(key, value.clone());
        Ok(value)
    }
}

impl<V: Clone + Send + 'static> CacheStore<V> {
    /// Periodically purge expired entries
    ///
    /// The task holds only a weak reference and exits once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let interval = interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    break;
                };
                let removed = store.purge_expired();
                if removed > 0 {
                    logger::debug(
                        LogTag::Cache,
                        &format!("[{}] sweep removed {} expired entries", store.name, removed),
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(ttl_secs: u64, capacity: usize) -> CacheStore<String> {
        CacheStore::new("test", CacheConfig::custom(ttl_secs, capacity))
    }

    #[tokio::test]
    async fn test_basic_operations() {
        let cache = store(60, 100);

        cache.set("key1", "value1".to_string());
        assert_eq!(cache.get("key1"), Some("value1".to_string()));
        assert!(cache.has("key1"));

        assert_eq!(cache.get("nonexistent"), None);
        assert!(!cache.has("nonexistent"));

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.inserts, 1);

        assert!(cache.delete("key1"));
        assert!(!cache.delete("key1"));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiration_is_lazy() {
        let cache = store(1, 100);

        cache.set("key", "value".to_string());
        assert_eq!(cache.get("key"), Some("value".to_string()));

        tokio::time::advance(Duration::from_millis(1500)).await;

        // Still physically present until touched
        assert_eq!(cache.len(), 1);
        assert!(!cache.has("key"));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get("key"), None);
        assert_eq!(cache.metrics().expirations, 1);
    }

    #[tokio::test]
    async fn test_lru_eviction_uses_last_access_not_insertion() {
        let cache = store(60, 2);

        cache.set("key1", "value1".to_string());
        cache.set("key2", "value2".to_string());

        // key1 is older by insertion but most recently accessed
        assert!(cache.get("key1").is_some());

        cache.set("key3", "value3".to_string());

        assert_eq!(cache.get("key2"), None);
        assert_eq!(cache.get("key1"), Some("value1".to_string()));
        assert_eq!(cache.get("key3"), Some("value3".to_string()));
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let cache = store(60, 2);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        cache.set("a", "3".to_string());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some("3".to_string()));
        assert_eq!(cache.metrics().evictions, 0);
    }

    #[tokio::test]
    async fn test_get_or_set_runs_producer_once_per_miss() {
        let cache = store(60, 10);
        let mut calls = 0;

        for _ in 0..3 {
            let value: Result<String, String> = cache
                .get_or_set("k", || {
                    calls += 1;
                    async { Ok("produced".to_string()) }
                })
                .await;
            assert_eq!(value.unwrap(), "produced");
        }

        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_get_or_set_does_not_cache_errors() {
        let cache = store(60, 10);

        let failed: Result<String, String> = cache
            .get_or_set("k", || async { Err("upstream down".to_string()) })
            .await;
        assert!(failed.is_err());
        assert!(!cache.has("k"));

        let ok: Result<String, String> = cache
            .get_or_set("k", || async { Ok("recovered".to_string()) })
            .await;
        assert_eq!(ok.unwrap(), "recovered");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_entries() {
        let cache = Arc::new(store(1, 10));
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());

        let handle = cache.spawn_sweeper(Duration::from_secs(2));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.metrics().expirations, 2);

        handle.abort();
    }
}
