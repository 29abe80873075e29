//! In-memory page cache with stale-while-revalidate semantics

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A cached value and when it was produced
#[derive(Debug)]
struct CacheEntry<V> {
    value: Arc<V>,
    generated_at: Instant,
    revalidating: bool,
}

/// Result of a cache lookup
#[derive(Debug)]
pub enum Lookup<V> {
    /// Within the revalidation window
    Fresh(Arc<V>),
    /// Past the window; serve it anyway. `refresh` is set for exactly one
    /// caller, who is expected to refetch and call `complete` or `abort`.
    Stale { value: Arc<V>, refresh: bool },
    /// Never generated, or evicted
    Miss,
}

/// Keyed page cache
///
/// Entries never expire on their own: an old entry keeps being served until a
/// refresh replaces or evicts it.
#[derive(Debug)]
pub struct PageCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    revalidate: Duration,
}

impl<V> PageCache<V> {
    pub fn new(revalidate: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            revalidate,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a key at the current time
    pub fn lookup(&self, key: &str) -> Lookup<V> {
        self.lookup_at(key, Instant::now())
    }

    /// Look up a key as of `now`
    pub fn lookup_at(&self, key: &str, now: Instant) -> Lookup<V> {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            return Lookup::Miss;
        };

        if now.saturating_duration_since(entry.generated_at) < self.revalidate {
            return Lookup::Fresh(entry.value.clone());
        }

        let refresh = !entry.revalidating;
        entry.revalidating = true;
        Lookup::Stale {
            value: entry.value.clone(),
            refresh,
        }
    }

    /// Store a freshly generated value
    pub fn insert(&self, key: &str, value: V) -> Arc<V> {
        self.insert_at(key, value, Instant::now())
    }

    pub fn insert_at(&self, key: &str, value: V, now: Instant) -> Arc<V> {
        let value = Arc::new(value);
        self.entries().insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                generated_at: now,
                revalidating: false,
            },
        );
        value
    }

    /// Finish a refresh with a new value
    pub fn complete(&self, key: &str, value: V) {
        self.insert(key, value);
    }

    /// Finish a refresh that failed; the stale value stays and the next
    /// lookup may try again
    pub fn abort(&self, key: &str) {
        if let Some(entry) = self.entries().get_mut(key) {
            entry.revalidating = false;
        }
    }

    /// Drop an entry whose source record no longer exists
    pub fn evict(&self, key: &str) {
        self.entries().remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
