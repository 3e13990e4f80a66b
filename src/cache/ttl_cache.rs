//! Generic TTL cache used for both profile and rank entries.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// `(value, inserted_at)` pair stored per key.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Keyed in-memory store with lazy per-entry expiry.
///
/// All operations are non-blocking; DashMap's shard locking makes the map
/// safe for concurrent use without external synchronization. Staleness is
/// checked at `get` time: an entry older than the TTL is removed on
/// observation and reported as a miss, so fetching stays the caller's
/// responsibility. Concurrent `put`s to one key are last-write-wins.
#[derive(Debug)]
pub struct TtlCache<K: Eq + Hash, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Returns the cached value if present and fresh; stale entries are
    /// dropped and reported as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
        }

        // Stale or absent. remove_if re-checks freshness under the shard
        // lock so a concurrent overwrite is not discarded.
        self.entries
            .remove_if(key, |_, entry| entry.inserted_at.elapsed() >= self.ttl);
        None
    }

    /// Inserts or overwrites the entry with the current timestamp.
    pub fn put(&self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Removes an entry if present; absent keys are a no-op.
    pub fn evict(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl_ms: u64) -> TtlCache<String, i32> {
        TtlCache::new(Duration::from_millis(ttl_ms))
    }

    #[test]
    fn test_put_then_get() {
        let cache = cache(60_000);

        assert_eq!(cache.get(&"a".to_string()), None);
        cache.put("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
    }

    #[test]
    fn test_put_overwrites() {
        let cache = cache(60_000);

        cache.put("a".to_string(), 1);
        cache.put("a".to_string(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = cache(50);

        cache.put("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        std::thread::sleep(Duration::from_millis(120));
        assert_eq!(cache.get(&"a".to_string()), None);
        // Lazy expiry removed the entry entirely.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reinsert_restarts_ttl() {
        let cache = cache(400);

        cache.put("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(250));
        cache.put("a".to_string(), 2);
        std::thread::sleep(Duration::from_millis(250));

        // 500ms since the first put, 250ms since the overwrite: the
        // overwrite's timestamp governs, so the entry is still fresh.
        assert_eq!(cache.get(&"a".to_string()), Some(2));
    }

    #[test]
    fn test_evict() {
        let cache = cache(60_000);

        cache.put("a".to_string(), 1);
        assert!(cache.evict(&"a".to_string()));
        assert_eq!(cache.get(&"a".to_string()), None);

        // Evicting an absent key is a no-op, not an error.
        assert!(!cache.evict(&"a".to_string()));
    }

    #[test]
    fn test_clear() {
        let cache = cache(60_000);

        cache.put("a".to_string(), 1);
        cache.put("b".to_string(), 2);
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.get(&"b".to_string()), None);
    }
}
