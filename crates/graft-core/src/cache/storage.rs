//! Append-only entry storage behind the memoized cache
//!
//! Two layouts are supported: a plain vector scanned with value equality, and
//! a vector kept in ascending hash order so lookups and insertions can binary
//! search.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Hash used to order entries
pub(crate) fn key_hash<K: Hash + ?Sized>(key: &K) -> u64 {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Entries compared by equality, in insertion order
#[derive(Debug)]
pub(crate) struct EqualityStore<K, V> {
    entries: Vec<(K, V)>,
}

impl<K: Eq, V> EqualityStore<K, V> {
    pub(crate) fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub(crate) fn find(&self, key: &K) -> Option<&V> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    pub(crate) fn insert(&mut self, key: K, value: V) {
        self.entries.push((key, value));
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Entries kept in ascending hash order
#[derive(Debug)]
pub(crate) struct HashOrderedStore<K, V> {
    entries: Vec<HashedEntry<K, V>>,
}

#[derive(Debug)]
struct HashedEntry<K, V> {
    hash: u64,
    key: K,
    value: V,
}

impl<K: Eq + Hash, V> HashOrderedStore<K, V> {
    pub(crate) fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub(crate) fn find(&self, key: &K) -> Option<&V> {
        let hash = key_hash(key);
        let start = self.entries.partition_point(|entry| entry.hash < hash);
        self.entries[start..]
            .iter()
            .take_while(|entry| entry.hash == hash)
            .find(|entry| &entry.key == key)
            .map(|entry| &entry.value)
    }

    pub(crate) fn insert(&mut self, key: K, value: V) {
        let hash = key_hash(&key);
        // after any entries sharing the hash, so equal-hash order is insertion order
        let index = self.entries.partition_point(|entry| entry.hash <= hash);
        self.entries.insert(index, HashedEntry { hash, key, value });
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|entry| &entry.value)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    fn hashes(&self) -> Vec<u64> {
        self.entries.iter().map(|entry| entry.hash).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Key whose hash ignores half of its value, forcing collisions
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Colliding(u32, &'static str);

    impl Hash for Colliding {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.0.hash(state);
        }
    }

    #[test]
    fn test_equality_store_finds_by_value() {
        let mut store = EqualityStore::new();
        store.insert(String::from("a"), 1);
        store.insert(String::from("b"), 2);

        let lookup = ["b"].concat();
        assert_eq!(store.find(&lookup), Some(&2));
        assert_eq!(store.find(&"c".to_string()), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_hash_ordered_store_stays_sorted() {
        let mut store = HashOrderedStore::new();
        for i in 0..64u32 {
            store.insert(i, i * 10);
        }
        let hashes = store.hashes();
        assert!(hashes.windows(2).all(|pair| pair[0] <= pair[1]));
        for i in 0..64u32 {
            assert_eq!(store.find(&i), Some(&(i * 10)));
        }
        assert_eq!(store.find(&99), None);
    }

    #[test]
    fn test_hash_ordered_store_resolves_collisions_by_equality() {
        let mut store = HashOrderedStore::new();
        store.insert(Colliding(1, "first"), "one");
        store.insert(Colliding(1, "second"), "two");
        store.insert(Colliding(2, "first"), "three");

        assert_eq!(store.find(&Colliding(1, "second")), Some(&"two"));
        assert_eq!(store.find(&Colliding(1, "first")), Some(&"one"));
        assert_eq!(store.find(&Colliding(1, "third")), None);
        assert_eq!(store.values().count(), 3);
    }

    #[test]
    fn test_clear_empties_store() {
        let mut store = HashOrderedStore::new();
        store.insert("k", 1);
        store.clear();
        assert_eq!(store.len(), 0);
        assert_eq!(store.find(&"k"), None);
    }
}
