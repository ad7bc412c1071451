//! Bounded TTL cache
//!
//! Thread-safe cache with per-entry expiry and a hard capacity: when the
//! cache is full the oldest inserted entry is evicted. Used for remote
//! search results where the remote call is expensive and mildly stale data
//! is acceptable.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::resilience::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

struct CacheStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    entries: HashMap<K, CacheEntry<V>>,
    /// Insertion order, oldest first
    insert_order: Vec<K>,
}

/// Thread-safe TTL cache with oldest-first eviction.
///
/// Cloning shares the underlying storage.
pub struct TtlCache<K, V, C = SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    storage: Arc<RwLock<CacheStorage<K, V>>>,
    capacity: usize,
    ttl: Duration,
    clock: C,
}

impl<K, V> TtlCache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache with the given capacity and entry TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, SystemClock)
    }
}

impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    /// Create a cache with a custom clock (useful for tests).
    pub fn with_clock(capacity: usize, ttl: Duration, clock: C) -> Self {
        Self {
            storage: Arc::new(RwLock::new(CacheStorage {
                entries: HashMap::new(),
                insert_order: Vec::new(),
            })),
            capacity: capacity.max(1),
            ttl,
            clock,
        }
    }

    /// Look up a live entry; expired entries are removed on access.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();

        {
            let storage = self.storage.read().ok()?;
            match storage.entries.get(key) {
                Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Entry exists but has expired
        if let Ok(mut storage) = self.storage.write() {
            storage.entries.remove(key);
            storage.insert_order.retain(|k| k != key);
        }
        None
    }

    /// Insert an entry, evicting the oldest one when at capacity.
    pub fn insert(&self, key: K, value: V) {
        let Ok(mut storage) = self.storage.write() else {
            return;
        };

        if storage.entries.contains_key(&key) {
            storage.insert_order.retain(|k| k != &key);
        } else if storage.entries.len() >= self.capacity {
            if !storage.insert_order.is_empty() {
                let oldest = storage.insert_order.remove(0);
                storage.entries.remove(&oldest);
            }
        }

        storage
            .entries
            .insert(key.clone(), CacheEntry { value, inserted_at: self.clock.now() });
        storage.insert_order.push(key);
    }

    /// Number of entries currently stored (including not-yet-collected
    /// expired ones).
    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V, C> Clone for TtlCache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            capacity: self.capacity,
            ttl: self.ttl,
            clock: self.clock.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::MockClock;

    #[test]
    fn get_returns_inserted_value() {
        let cache: TtlCache<String, i32> = TtlCache::new(10, Duration::from_secs(60));
        cache.insert("key".to_string(), 42);
        assert_eq!(cache.get(&"key".to_string()), Some(42));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let clock = MockClock::new();
        let cache: TtlCache<String, i32, _> =
            TtlCache::with_clock(10, Duration::from_secs(300), clock.clone());

        cache.insert("q".to_string(), 1);
        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get(&"q".to_string()), Some(1));

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get(&"q".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn oldest_entry_is_evicted_at_capacity() {
        let cache: TtlCache<i32, i32> = TtlCache::new(3, Duration::from_secs(60));
        for i in 0..3 {
            cache.insert(i, i);
        }
        cache.insert(3, 3);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&0), None);
        assert_eq!(cache.get(&3), Some(3));
    }

    #[test]
    fn reinsert_refreshes_entry_age() {
        let cache: TtlCache<i32, i32> = TtlCache::new(2, Duration::from_secs(60));
        cache.insert(1, 1);
        cache.insert(2, 2);
        cache.insert(1, 10); // now 2 is the oldest
        cache.insert(3, 3);

        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(10));
        assert_eq!(cache.get(&3), Some(3));
    }
}
