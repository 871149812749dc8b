//! Lock-striped concurrent hash map
//!
//! Keys hash to one of a fixed number of stripes, each behind its own
//! `RwLock`, so unrelated keys rarely contend.

use crate::value::{read, write};
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::RwLock;

const STRIPES: usize = 16;

pub struct StripedMap<K, V> {
    hasher: RandomState,
    stripes: Vec<RwLock<HashMap<K, V>>>,
}

impl<K: Hash + Eq, V: Clone> StripedMap<K, V> {
    pub fn new() -> Self {
        Self {
            hasher: RandomState::new(),
            stripes: (0..STRIPES).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn stripe(&self, key: &K) -> &RwLock<HashMap<K, V>> {
        let index = self.hasher.hash_one(key) as usize % STRIPES;
        &self.stripes[index]
    }

    pub fn get(&self, key: &K) -> Option<V> {
        read(self.stripe(key)).get(key).cloned()
    }

    pub fn get_or_insert_with(&self, key: K, create: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let mut stripe = write(self.stripe(&key));
        stripe.entry(key).or_insert_with(create).clone()
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        write(self.stripe(&key)).insert(key, value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        write(self.stripe(key)).remove(key)
    }

    /// Applies `update` to the entry for `key`, creating it first if needed
    pub fn update(&self, key: K, create: impl FnOnce() -> V, update: impl FnOnce(&mut V)) {
        let mut stripe = write(self.stripe(&key));
        update(stripe.entry(key).or_insert_with(create));
    }

    /// Keeps the entries `keep` accepts; returns how many were dropped
    pub fn retain(&self, mut keep: impl FnMut(&K, &mut V) -> bool) -> usize {
        let mut dropped = 0;
        for stripe in &self.stripes {
            let mut stripe = write(stripe);
            let before = stripe.len();
            stripe.retain(|key, value| keep(key, value));
            dropped += before - stripe.len();
        }
        dropped
    }

    pub fn values(&self) -> Vec<V> {
        self.stripes
            .iter()
            .flat_map(|stripe| read(stripe).values().cloned().collect::<Vec<_>>())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stripes.iter().map(|stripe| read(stripe).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Hash + Eq, V: Clone> Default for StripedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
