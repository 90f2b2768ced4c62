//! Size-bounded TTL result cache (`spec.md` §4.6).
//!
//! Keys are the canonicalized `(operation, serialized-params)` pair of a
//! retrieval call. Eviction is oldest-first once the configured byte budget
//! is exceeded; entries larger than the budget are never cached.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Default cache budget: 100 MiB.
pub const DEFAULT_MAX_SIZE_BYTES: usize = 100 * 1024 * 1024;
/// Default entry lifetime: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Configuration for a [`ResultCache`].
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Total byte budget across all cached entries.
    pub max_size_bytes: usize,
    /// How long an entry remains valid after insertion.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_size_bytes: DEFAULT_MAX_SIZE_BYTES, default_ttl: DEFAULT_TTL }
    }
}

struct CacheEntry {
    value: Vec<u8>,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Point-in-time statistics for a [`ResultCache`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of lookups that found a live entry.
    pub hits: u64,
    /// Number of lookups that found nothing or an expired entry.
    pub misses: u64,
    /// Number of entries evicted to make room for a new insert.
    pub evictions: u64,
    /// Current total size of cached values, in bytes.
    pub size_bytes: usize,
    /// Running sum of lookup durations, used to compute the mean on demand.
    total_lookup_nanos: u64,
    /// Number of lookups counted in `total_lookup_nanos` (hits + misses).
    lookup_count: u64,
}

impl CacheStats {
    /// Fraction of lookups that were hits, `0.0` if there have been none.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }

    /// Mean lookup latency in milliseconds, `0.0` if there have been none.
    #[must_use]
    pub fn average_lookup_ms(&self) -> f64 {
        if self.lookup_count == 0 { 0.0 } else { (self.total_lookup_nanos as f64 / self.lookup_count as f64) / 1_000_000.0 }
    }
}

/// Size-bounded, TTL-expiring cache for serialized operation results.
///
/// Entries are ordered LRU; when an insert would exceed `max_size_bytes`,
/// the least-recently-used entries are evicted (oldest-first) until there
/// is room. An entry larger than the whole budget is never cached.
pub struct ResultCache {
    config: CacheConfig,
    entries: RwLock<LruCache<String, CacheEntry>>,
    stats: RwLock<CacheStats>,
}

impl ResultCache {
    /// Creates a cache with the given configuration.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        // The byte budget is enforced manually on insert; the `LruCache`
        // itself just needs a capacity large enough to never be the thing
        // that evicts, so a huge soft cap of entry *count* is used instead.
        let cap = NonZeroUsize::new(1_000_000).unwrap_or(NonZeroUsize::MIN);
        Self { config, entries: RwLock::new(LruCache::new(cap)), stats: RwLock::new(CacheStats::default()) }
    }

    /// Builds the canonical cache key for an operation and its parameters.
    #[must_use]
    pub fn key(operation: &str, serialized_params: &str) -> String {
        format!("{operation}:{serialized_params}")
    }

    /// Looks up `key`, returning the cached value if present and not
    /// expired. Expired entries are evicted lazily on lookup.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let started = Instant::now();
        let found = {
            let Ok(mut entries) = self.entries.write() else { return None };
            match entries.get(key) {
                Some(entry) if entry.is_expired() => {
                    let size = entry.value.len();
                    entries.pop(key);
                    self.account_eviction(size);
                    None
                },
                Some(entry) => Some(entry.value.clone()),
                None => None,
            }
        };
        self.record_lookup(started.elapsed(), found.is_some());
        found
    }

    /// Inserts `value` under `key` with the cache's default TTL.
    ///
    /// Entries larger than `max_size_bytes` are silently not cached (a
    /// cache is an optimization, never a correctness requirement).
    pub fn put(&self, key: String, value: Vec<u8>) {
        self.put_with_ttl(key, value, self.config.default_ttl);
    }

    /// Inserts `value` under `key` with an explicit TTL.
    pub fn put_with_ttl(&self, key: String, value: Vec<u8>, ttl: Duration) {
        let size = value.len();
        if size > self.config.max_size_bytes {
            tracing::debug!(key = %key, size, "entry too large to cache, skipping");
            return;
        }

        let Ok(mut entries) = self.entries.write() else { return };
        if let Some(old) = entries.peek(&key) {
            self.shrink_size(old.value.len());
        }

        self.make_room(&mut entries, size);

        entries.put(key, CacheEntry { value, inserted_at: Instant::now(), ttl });
        self.grow_size(size);
    }

    /// Evicts oldest-first until `incoming_size` more bytes fit within the
    /// configured budget.
    fn make_room(&self, entries: &mut LruCache<String, CacheEntry>, incoming_size: usize) {
        let Ok(mut stats) = self.stats.write() else { return };
        while stats.size_bytes + incoming_size > self.config.max_size_bytes {
            let Some((_, evicted)) = entries.pop_lru() else { break };
            stats.size_bytes = stats.size_bytes.saturating_sub(evicted.value.len());
            stats.evictions += 1;
        }
    }

    /// Removes `key` unconditionally.
    pub fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write() {
            if let Some(entry) = entries.pop(key) {
                self.shrink_size(entry.value.len());
            }
        }
    }

    /// Clears the entire cache.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
        if let Ok(mut stats) = self.stats.write() {
            stats.size_bytes = 0;
        }
    }

    /// Returns a snapshot of the cache's current statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.read().map(|s| *s).unwrap_or_default()
    }

    fn record_lookup(&self, elapsed: Duration, hit: bool) {
        let Ok(mut stats) = self.stats.write() else { return };
        if hit {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        stats.total_lookup_nanos += elapsed.as_nanos().min(u128::from(u64::MAX)) as u64;
        stats.lookup_count += 1;
    }

    fn account_eviction(&self, freed_bytes: usize) {
        if let Ok(mut stats) = self.stats.write() {
            stats.size_bytes = stats.size_bytes.saturating_sub(freed_bytes);
            stats.evictions += 1;
        }
    }

    fn grow_size(&self, bytes: usize) {
        if let Ok(mut stats) = self.stats.write() {
            stats.size_bytes += bytes;
        }
    }

    fn shrink_size(&self, bytes: usize) {
        if let Ok(mut stats) = self.stats.write() {
            stats.size_bytes = stats.size_bytes.saturating_sub(bytes);
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = ResultCache::default();
        let key = ResultCache::key("search_nodes", "q=alice&limit=20");
        cache.put(key.clone(), b"result-bytes".to_vec());
        assert_eq!(cache.get(&key), Some(b"result-bytes".to_vec()));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn missing_key_counts_as_a_miss() {
        let cache = ResultCache::default();
        assert_eq!(cache.get("nope"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn entry_larger_than_budget_is_never_cached() {
        let cache = ResultCache::new(CacheConfig { max_size_bytes: 4, default_ttl: DEFAULT_TTL });
        cache.put("k".to_string(), vec![0u8; 16]);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.stats().size_bytes, 0);
    }

    #[test]
    fn expired_entry_is_evicted_lazily_on_read() {
        let cache = ResultCache::new(CacheConfig { max_size_bytes: DEFAULT_MAX_SIZE_BYTES, default_ttl: Duration::from_millis(10) });
        cache.put("k".to_string(), vec![1, 2, 3]);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.stats().size_bytes, 0);
    }

    #[test]
    fn oldest_entry_evicted_first_when_budget_exceeded() {
        let cache = ResultCache::new(CacheConfig { max_size_bytes: 10, default_ttl: DEFAULT_TTL });
        cache.put("a".to_string(), vec![0u8; 6]);
        cache.put("b".to_string(), vec![0u8; 6]);
        assert_eq!(cache.get("a"), None, "oldest entry should have been evicted to make room");
        assert_eq!(cache.get("b"), Some(vec![0u8; 6]));
        assert!(cache.stats().evictions >= 1);
    }

    #[test]
    fn invalidate_removes_a_specific_key() {
        let cache = ResultCache::default();
        cache.put("k".to_string(), vec![1]);
        cache.invalidate("k");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn hit_rate_reflects_hits_and_misses() {
        let cache = ResultCache::default();
        cache.put("k".to_string(), vec![1]);
        let _ = cache.get("k");
        let _ = cache.get("missing");
        assert!((cache.stats().hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}
