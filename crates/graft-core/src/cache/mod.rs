//! Memoized, thread-safe, append-only cache
//!
//! Every expensive result the engine derives (discovered members, member
//! matches, compiled plans) is stored in a [`MemoCache`]. Readers share a read
//! lock; a miss enters a single writer phase, re-checks the storage, and only
//! then runs the factory, so a factory never runs twice for equal keys.
//! Entries are never updated or removed individually; [`MemoCache::reset`]
//! clears everything.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

mod storage;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use storage::{EqualityStore, HashOrderedStore};

pub(crate) use storage::key_hash;

/// Key comparison strategy, fixed per cache instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyComparison {
    /// Linear scan with value equality
    Equality,
    /// Binary search over entries kept in ascending hash order
    #[default]
    HashOrdered,
}

impl fmt::Display for KeyComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyComparison::Equality => write!(f, "equality"),
            KeyComparison::HashOrdered => write!(f, "hash-ordered"),
        }
    }
}

#[derive(Debug)]
enum Storage<K, V> {
    Equality(EqualityStore<K, V>),
    HashOrdered(HashOrderedStore<K, V>),
}

impl<K: Eq + Hash, V> Storage<K, V> {
    fn new(comparison: KeyComparison) -> Self {
        match comparison {
            KeyComparison::Equality => Storage::Equality(EqualityStore::new()),
            KeyComparison::HashOrdered => Storage::HashOrdered(HashOrderedStore::new()),
        }
    }

    fn find(&self, key: &K) -> Option<&V> {
        match self {
            Storage::Equality(store) => store.find(key),
            Storage::HashOrdered(store) => store.find(key),
        }
    }

    fn insert(&mut self, key: K, value: V) {
        match self {
            Storage::Equality(store) => store.insert(key, value),
            Storage::HashOrdered(store) => store.insert(key, value),
        }
    }

    fn values(&self) -> Box<dyn Iterator<Item = &V> + '_> {
        match self {
            Storage::Equality(store) => Box::new(store.values()),
            Storage::HashOrdered(store) => Box::new(store.values()),
        }
    }

    fn len(&self) -> usize {
        match self {
            Storage::Equality(store) => store.len(),
            Storage::HashOrdered(store) => store.len(),
        }
    }

    fn clear(&mut self) {
        match self {
            Storage::Equality(store) => store.clear(),
            Storage::HashOrdered(store) => store.clear(),
        }
    }
}

/// Cache statistics for monitoring and debugging
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub name: &'static str,
    pub comparison: KeyComparison,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups answered from storage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Append-only compute-if-absent cache
pub struct MemoCache<K, V> {
    name: &'static str,
    comparison: KeyComparison,
    storage: RwLock<Storage<K, V>>,
    writer: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache
    pub fn new(name: &'static str, comparison: KeyComparison) -> Self {
        Self {
            name,
            comparison,
            storage: RwLock::new(Storage::new(comparison)),
            writer: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a value without computing it
    pub fn get(&self, key: &K) -> Option<V> {
        self.storage.read().find(key).cloned()
    }

    /// Return the cached value for `key`, computing it with `factory` on a miss
    pub fn get_or_add<F>(&self, key: K, factory: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        match self.get_or_try_add(key, |key| Ok::<V, Infallible>(factory(key))) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`get_or_add`](Self::get_or_add); a failed factory
    /// stores nothing, so the next call retries
    pub fn get_or_try_add<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        let _writer = self.writer.lock();
        // another writer may have published while we waited
        if let Some(value) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(cache = self.name, "cache miss, computing entry");
        let value = factory(&key)?;
        self.storage.write().insert(key, value.clone());
        Ok(value)
    }

    /// Snapshot of all cached values
    pub fn values(&self) -> Vec<V> {
        self.storage.read().values().cloned().collect()
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.storage.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear every entry; serialized with in-flight factories
    pub fn reset(&self) {
        let _writer = self.writer.lock();
        self.storage.write().clear();
        tracing::debug!(cache = self.name, "cache reset");
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            name: self.name,
            comparison: self.comparison,
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Name given at creation
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<K, V> fmt::Debug for MemoCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCache")
            .field("name", &self.name)
            .field("comparison", &self.comparison)
            .finish_non_exhaustive()
    }
}
