//! In-memory TTL cache.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use folio_core::constants::{
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECS, FALLBACK_CACHE_TTL_SECS,
};

/// Cache entry with TTL.
#[derive(Clone)]
struct CacheEntry<T> {
    data: T,
    inserted_at: Instant,
    expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(data: T, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            data,
            inserted_at: now,
            expires_at: now + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// TTL applied by `set` and successful fetches, in seconds
    pub default_ttl_seconds: u64,
    /// TTL applied to fallback values after a failed fetch, in seconds
    pub fallback_ttl_seconds: u64,
    /// Whether to sweep expired entries before evicting live ones
    pub auto_cleanup: bool,
}

impl CacheConfig {
    /// Default TTL as a `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    /// Fallback TTL as a `Duration`.
    pub fn fallback_ttl(&self) -> Duration {
        Duration::from_secs(self.fallback_ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            default_ttl_seconds: DEFAULT_CACHE_TTL_SECS,
            fallback_ttl_seconds: FALLBACK_CACHE_TTL_SECS,
            auto_cleanup: true,
        }
    }
}

/// In-memory key/value cache with per-entry expiry.
///
/// Expired entries are treated as absent and removed lazily when read through
/// [`get`](Self::get) or [`has`](Self::has). [`keys`](Self::keys) does not check
/// expiry, so it may list entries that a read would evict.
///
/// Thread-safe; share it behind an `Arc`.
///
/// A [`cached_fetch`](Self::cached_fetch) that overlaps a `delete`, `clear` or
/// [`invalidate_pending`](Self::invalidate_pending) still returns its value but
/// does not cache it, so a read that started before a write cannot re-cache
/// data the write made stale.
pub struct TtlCache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    config: CacheConfig,
    /// Bumped by every invalidation
    generation: AtomicU64,
}

impl<T: Clone> TtlCache<T> {
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            generation: AtomicU64::new(0),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Gets a cached value.
    ///
    /// Returns None if not cached or expired; an expired entry is evicted.
    pub fn get(&self, key: &str) -> Option<T> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired() => return Some(entry.data.clone()),
                Some(_) => {}
            }
        }
        self.evict_if_expired(key);
        None
    }

    /// Returns true if `key` holds an unexpired value.
    pub fn has(&self, key: &str) -> bool {
        let expired = match self.entries.read().get(key) {
            None => return false,
            Some(entry) => entry.is_expired(),
        };
        if expired {
            self.evict_if_expired(key);
        }
        !expired
    }

    /// Caches a value with the default TTL.
    pub fn set(&self, key: &str, value: T) {
        self.set_with_ttl(key, value, self.config.default_ttl());
    }

    /// Caches a value with a custom TTL, replacing any existing entry.
    pub fn set_with_ttl(&self, key: &str, value: T, ttl: Duration) {
        self.insert(&mut self.entries.write(), key, value, ttl);
    }

    fn insert(
        &self,
        entries: &mut HashMap<String, CacheEntry<T>>,
        key: &str,
        value: T,
        ttl: Duration,
    ) {
        if !entries.contains_key(key) && entries.len() >= self.config.max_entries {
            if self.config.auto_cleanup {
                entries.retain(|_, e| !e.is_expired());
            }
            // Still at capacity? Remove oldest entry
            if entries.len() >= self.config.max_entries {
                if let Some(oldest_key) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest_key);
                }
            }
        }

        entries.insert(key.to_string(), CacheEntry::new(value, ttl));
    }

    /// Caches `value` unless an invalidation happened since `generation` was read.
    fn insert_if_current(&self, generation: u64, key: &str, value: T, ttl: Duration) -> bool {
        let mut entries = self.entries.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        self.insert(&mut entries, key, value, ttl);
        true
    }

    /// Removes an entry. Returns true if one was present.
    pub fn delete(&self, key: &str) -> bool {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.remove(key).is_some()
    }

    /// Clears all cached entries.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.clear();
    }

    /// Stops fetches already in flight from caching their results.
    ///
    /// Call before deleting keys that a concurrent fetch may be about to fill.
    pub fn invalidate_pending(&self) {
        let _entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Snapshot of every stored key, expired or not.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Time left before `key` expires, if it is cached and live.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.entries
            .read()
            .get(key)
            .and_then(|e| e.expires_at.checked_duration_since(Instant::now()))
            .filter(|left| !left.is_zero())
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its result.
    ///
    /// On a successful fetch the value is stored for `ttl` (default TTL when
    /// `None`). If the fetch fails and a `fallback` is given, the fallback is
    /// cached for the short fallback TTL and returned in place of the error.
    /// Without a fallback the error is returned unchanged and nothing is cached.
    pub async fn cached_fetch<F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
        fallback: Option<T>,
        ttl: Option<Duration>,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if let Some(hit) = self.get(key) {
            trace!(key, "cache hit");
            return Ok(hit);
        }

        debug!(key, "cache miss, fetching");
        let generation = self.generation.load(Ordering::SeqCst);
        match fetch().await {
            Ok(value) => {
                let ttl = ttl.unwrap_or_else(|| self.config.default_ttl());
                if !self.insert_if_current(generation, key, value.clone(), ttl) {
                    debug!(key, "invalidated during fetch, not caching");
                }
                Ok(value)
            }
            Err(err) => match fallback {
                Some(fallback) => {
                    warn!(key, error = %err, "fetch failed, serving fallback");
                    let ttl = self.config.fallback_ttl();
                    self.insert_if_current(generation, key, fallback.clone(), ttl);
                    Ok(fallback)
                }
                None => Err(err),
            },
        }
    }

    /// Removes all expired entries.
    pub fn cleanup_expired(&self) {
        self.entries.write().retain(|_, e| !e.is_expired());
    }

    /// Returns the number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let expired = entries.values().filter(|e| e.is_expired()).count();
        CacheStats {
            total_entries: entries.len(),
            expired_entries: expired,
            valid_entries: entries.len().saturating_sub(expired),
            capacity: self.config.max_entries,
        }
    }

    fn evict_if_expired(&self, key: &str) {
        let mut entries = self.entries.write();
        // Another writer may have refreshed the key since the read lock was dropped.
        if entries.get(key).is_some_and(|e| e.is_expired()) {
            entries.remove(key);
            trace!(key, "evicted expired entry");
        }
    }
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    /// Total entries (including expired)
    pub total_entries: usize,
    /// Expired entries awaiting eviction
    pub expired_entries: usize,
    /// Valid (non-expired) entries
    pub valid_entries: usize,
    /// Maximum capacity
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct FetchError(&'static str);

    impl Display for FetchError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    #[test]
    fn test_cache_set_get() {
        let cache = TtlCache::new();
        cache.set("projects:all", vec!["casa-verde"]);
        assert_eq!(cache.get("projects:all"), Some(vec!["casa-verde"]));
    }

    #[test]
    fn test_cache_miss() {
        let cache: TtlCache<u32> = TtlCache::new();
        assert!(cache.get("nothing").is_none());
        assert!(!cache.has("nothing"));
    }

    #[test]
    fn test_set_overwrites() {
        let cache = TtlCache::new();
        cache.set("page:about", 1);
        cache.set("page:about", 2);
        assert_eq!(cache.get("page:about"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_delete() {
        let cache = TtlCache::new();
        cache.set("page:about", 1);

        assert!(cache.delete("page:about"));
        assert!(cache.get("page:about").is_none());
        // Missing key is not an error
        assert!(!cache.delete("page:about"));
    }

    #[test]
    fn test_cache_clear() {
        let cache = TtlCache::new();
        cache.set("a", 1);
        cache.set("b", 2);

        cache.clear();

        assert!(!cache.has("a"));
        assert!(!cache.has("b"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_ttl_expiration() {
        let cache = TtlCache::new();
        cache.set_with_ttl("short", "v", Duration::from_millis(100));
        assert_eq!(cache.get("short"), Some("v"));

        std::thread::sleep(Duration::from_millis(150));

        assert!(cache.get("short").is_none());
    }

    #[test]
    fn test_expired_entry_evicted_lazily() {
        let cache = TtlCache::new();
        cache.set_with_ttl("short", 1, Duration::from_millis(1));
        cache.set("long", 2);
        std::thread::sleep(Duration::from_millis(10));

        // Listing does not trigger expiry
        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["long".to_string(), "short".to_string()]);

        assert!(!cache.has("short"));
        assert_eq!(cache.keys(), vec!["long".to_string()]);
    }

    #[test]
    fn test_ttl_remaining() {
        let cache = TtlCache::new();
        cache.set("k", 1);
        let left = cache.ttl_remaining("k").unwrap();
        assert!(left <= Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
        assert!(left > Duration::from_secs(DEFAULT_CACHE_TTL_SECS - 5));
        assert!(cache.ttl_remaining("missing").is_none());
    }

    #[test]
    fn test_cache_capacity_eviction() {
        let config = CacheConfig {
            max_entries: 2,
            ..CacheConfig::default()
        };
        let cache = TtlCache::with_config(config);

        cache.set("a", 1);
        std::thread::sleep(Duration::from_millis(2));
        cache.set("b", 2);
        cache.set("c", 3);

        // Should have evicted oldest
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_capacity_prefers_expired_entries() {
        let config = CacheConfig {
            max_entries: 2,
            ..CacheConfig::default()
        };
        let cache = TtlCache::with_config(config);

        cache.set("old", 1);
        cache.set_with_ttl("stale", 2, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));
        cache.set("new", 3);

        assert_eq!(cache.get("old"), Some(1));
        assert_eq!(cache.get("new"), Some(3));
    }

    #[test]
    fn test_cache_stats() {
        let cache = TtlCache::new();
        cache.set("a", 1);
        cache.set_with_ttl("b", 2, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.valid_entries, 1);
        assert_eq!(stats.capacity, DEFAULT_CACHE_MAX_ENTRIES);
    }

    #[test]
    fn test_cache_cleanup_expired() {
        let cache = TtlCache::new();
        cache.set_with_ttl("a", 1, Duration::from_millis(1));
        cache.set("b", 2);
        std::thread::sleep(Duration::from_millis(10));

        cache.cleanup_expired();

        assert_eq!(cache.len(), 1);
        assert!(cache.get("b").is_some());
    }

    #[tokio::test]
    async fn test_cached_fetch_memoizes() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        for _ in 0..2 {
            let value = cache
                .cached_fetch(
                    "projects:all",
                    move || async move {
                        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                            Ok(vec![1, 2, 3])
                        } else {
                            Err(FetchError("fetch should run once"))
                        }
                    },
                    None,
                    None,
                )
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_fetch_refetches_after_delete() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let fetch = move || async move {
            Ok::<_, FetchError>(calls.fetch_add(1, Ordering::SeqCst))
        };

        assert_eq!(cache.cached_fetch("k", fetch, None, None).await, Ok(0));
        cache.delete("k");
        assert_eq!(cache.cached_fetch("k", fetch, None, None).await, Ok(1));
    }

    #[tokio::test]
    async fn test_cached_fetch_custom_ttl() {
        let cache = TtlCache::new();
        cache
            .cached_fetch(
                "k",
                || async { Ok::<_, FetchError>(7) },
                None,
                Some(Duration::from_millis(20)),
            )
            .await
            .unwrap();

        assert!(cache.has("k"));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!cache.has("k"));
    }

    #[tokio::test]
    async fn test_cached_fetch_serves_fallback() {
        let cache = TtlCache::new();

        let value = cache
            .cached_fetch(
                "projects:featured",
                || async { Err(FetchError("database unavailable")) },
                Some(Vec::<u32>::new()),
                None,
            )
            .await
            .unwrap();

        assert!(value.is_empty());
        assert_eq!(cache.get("projects:featured"), Some(Vec::new()));

        // Fallback lives for the short TTL, not the default one
        let left = cache.ttl_remaining("projects:featured").unwrap();
        assert!(left <= Duration::from_secs(FALLBACK_CACHE_TTL_SECS));
    }

    #[tokio::test]
    async fn test_fallback_expires_and_real_fetch_retries() {
        let config = CacheConfig {
            fallback_ttl_seconds: 1,
            ..CacheConfig::default()
        };
        let cache = TtlCache::with_config(config);

        let first = cache
            .cached_fetch("k", || async { Err(FetchError("down")) }, Some(0), None)
            .await;
        assert_eq!(first, Ok(0));

        // Still inside the fallback window: fetch is not attempted
        let during = cache
            .cached_fetch("k", || async { Ok::<_, FetchError>(42) }, Some(0), None)
            .await;
        assert_eq!(during, Ok(0));

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let after = cache
            .cached_fetch("k", || async { Ok::<_, FetchError>(42) }, Some(0), None)
            .await;
        assert_eq!(after, Ok(42));
    }

    #[tokio::test]
    async fn test_cached_fetch_propagates_without_fallback() {
        let cache: TtlCache<u32> = TtlCache::new();

        let result = cache
            .cached_fetch("page:about", || async { Err(FetchError("boom")) }, None, None)
            .await;

        assert_eq!(result, Err(FetchError("boom")));
        assert!(!cache.has("page:about"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_overlapping_invalidation_is_not_cached() {
        let cache = TtlCache::new();
        let cache = &cache;

        // A write lands while the read is still in flight
        let value = cache
            .cached_fetch(
                "projects:all",
                move || async move {
                    cache.invalidate_pending();
                    Ok::<_, FetchError>(vec!["stale"])
                },
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!(value, vec!["stale"]);
        assert!(!cache.has("projects:all"));

        // The next read caches normally
        cache
            .cached_fetch("projects:all", || async { Ok::<_, FetchError>(vec!["fresh"]) }, None, None)
            .await
            .unwrap();
        assert_eq!(cache.get("projects:all"), Some(vec!["fresh"]));
    }

    #[tokio::test]
    async fn test_fallback_overlapping_clear_is_not_cached() {
        let cache = TtlCache::new();
        let cache = &cache;

        let value = cache
            .cached_fetch(
                "pages:all",
                move || async move {
                    cache.clear();
                    Err(FetchError("down"))
                },
                Some(Vec::<u32>::new()),
                None,
            )
            .await;

        assert_eq!(value, Ok(Vec::new()));
        assert!(cache.is_empty());
    }
}
