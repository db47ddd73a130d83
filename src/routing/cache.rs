//! Bounded route-resolution cache.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::action::{Action, Verb};

const SHARDS: usize = 16;

/// `"VERB path"` → Action, split across independently locked LRU shards.
///
/// Null results are cached like any other. Concurrent inserts for the same
/// key keep the first value; both writers resolved the same route anyway.
pub struct RouteCache {
    shards: Vec<Mutex<LruCache<String, Action>>>,
}

impl RouteCache {
    /// `None` when `capacity` is zero.
    pub fn new(capacity: usize) -> Option<Self> {
        let per_shard = NonZeroUsize::new(capacity.div_ceil(SHARDS))?;
        let shards = (0..SHARDS).map(|_| Mutex::new(LruCache::new(per_shard))).collect();
        Some(Self { shards })
    }

    pub fn key(verb: Verb, path: &str) -> String {
        format!("{} {}", verb, path)
    }

    fn shard(&self, key: &str) -> &Mutex<LruCache<String, Action>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    pub fn get(&self, key: &str) -> Option<Action> {
        self.shard(key).lock().get(key).cloned()
    }

    pub fn insert(&self, key: String, action: Action) {
        let mut shard = self.shard(&key).lock();
        if !shard.contains(&key) {
            shard.put(key, action);
        }
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
