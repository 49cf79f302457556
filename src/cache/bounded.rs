//! # Bounded Cache
//!
//! Capacity-bounded LRU map shared by both cache layers: secret names at the
//! top level and version ids inside each secret.
//!
//! Values are handed out as `Arc<V>` so the lock is held only for the map
//! operation itself, never while a caller awaits the backend.

use lru::LruCache;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Result of [`BoundedCache::get_or_insert_with`]
#[derive(Debug)]
pub struct Admission<K, V> {
    /// The cached (or freshly inserted) value
    pub entry: Arc<V>,
    /// True when the key was absent and `entry` was just created
    pub inserted: bool,
    /// Key pushed out to make room for the insertion
    pub evicted: Option<K>,
}

/// Thread-safe LRU keyed by `K`, holding at most `capacity` values
pub struct BoundedCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, Arc<V>>>,
}

impl<K: Hash + Eq, V> std::fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("BoundedCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish_non_exhaustive()
    }
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up `key`, marking it most-recently-used, or insert `init()` under it
    ///
    /// Insertion may evict the least-recently-used key; it is reported in
    /// [`Admission::evicted`].
    pub fn get_or_insert_with<Q>(&self, key: &Q, init: impl FnOnce() -> V) -> Admission<K, V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(key) {
            return Admission {
                entry: Arc::clone(entry),
                inserted: false,
                evicted: None,
            };
        }

        let entry = Arc::new(init());
        // The key was just checked absent, so `push` only ever returns an evicted pair
        let evicted = entries
            .push(key.to_owned(), Arc::clone(&entry))
            .map(|(evicted_key, _)| evicted_key);
        Admission {
            entry,
            inserted: true,
            evicted,
        }
    }

    /// Look up `key` without touching recency
    #[must_use]
    pub fn peek<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.lock().peek(key).map(Arc::clone)
    }

    #[must_use]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.lock().contains(key)
    }

    /// Remove `key`, returning its value if it was cached
    pub fn remove<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.lock().pop(key)
    }

    /// Cached keys, most-recently-used first
    #[must_use]
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.entries.lock().iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}
