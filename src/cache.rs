//! Keyed read-through cache with time-to-live and epoch invalidation.
//!
//! Readers capture the current epoch before loading from the store. Every
//! invalidation bumps the epoch, and a load that finishes after a bump drops
//! the entry it just inserted. A concurrent reader can therefore never put a
//! row back into the cache after it was deleted from the store.
//!
//! Expired entries are dropped when read, and every [`SWEEP_INTERVAL`]
//! inserts the whole map is swept so keys that are never read again do not
//! pile up.

use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Number of inserts between two sweeps of expired entries.
pub const SWEEP_INTERVAL: u64 = 256;

struct Entry<V> {
    value: V,
    inserted: Instant,
    epoch: u64,
}

/// Concurrent TTL cache.
pub struct TtlCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    ttl: Duration,
    epoch: AtomicU64,
    inserts: AtomicU64,
    enabled: bool,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            epoch: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            enabled: true,
        }
    }

    /// Create a cache that never stores anything. Every lookup hits the loader.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(Duration::ZERO)
        }
    }

    /// Current invalidation epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get a live entry. Expired entries are evicted on access.
    pub fn get(&self, key: &K) -> Option<V> {
        if !self.enabled {
            return None;
        }

        if let Some(entry) = self.entries.get(key) {
            if entry.inserted.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }

        self.entries
            .remove_if(key, |_, entry| entry.inserted.elapsed() >= self.ttl);
        None
    }

    /// Insert a value loaded while `epoch` was current.
    ///
    /// Returns `false` (and keeps nothing) if an invalidation happened since.
    pub fn insert_if_current(&self, key: K, value: V, epoch: u64) -> bool {
        if !self.enabled || self.epoch() != epoch {
            return false;
        }

        self.entries.insert(
            key.clone(),
            Entry {
                value,
                inserted: Instant::now(),
                epoch,
            },
        );

        // An invalidation may have slipped in between the check and the insert.
        if self.epoch() != epoch {
            self.entries.remove_if(&key, |_, entry| entry.epoch == epoch);
            return false;
        }

        if (self.inserts.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0 {
            self.evict_expired();
        }
        true
    }

    /// Drop every entry whose time-to-live has passed.
    ///
    /// Returns the number of entries removed. The epoch is left alone: an
    /// expired entry would never have been served anyway.
    pub fn evict_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.inserted.elapsed() < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    /// Drop one key and advance the epoch.
    pub fn invalidate(&self, key: &K) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.entries.remove(key);
    }

    /// Drop every entry matching `predicate` and advance the epoch.
    pub fn invalidate_where(&self, predicate: impl Fn(&K, &V) -> bool) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.entries.retain(|key, entry| !predicate(key, &entry.value));
    }

    /// Read-through lookup.
    ///
    /// Returns the cached value or runs `load`; a loaded `Some` is cached
    /// unless an invalidation raced with the load.
    pub async fn get_or_load<F, Fut, E>(&self, key: &K, load: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(Some(value));
        }

        let epoch = self.epoch();
        let loaded = load().await?;
        if let Some(ref value) = loaded {
            self.insert_if_current(key.clone(), value.clone(), epoch);
        }
        Ok(loaded)
    }
}
