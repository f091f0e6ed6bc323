//! Result cache keyed by canonical view requests

use crate::core::query::{CacheKey, QueryResult};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Cached results, unbounded unless a capacity is given
///
/// With a capacity the least recently used entry is evicted first. Without
/// one, entries live until [`ResultCache::clear`].
pub struct ResultCache<R> {
    entries: LruCache<CacheKey, Arc<QueryResult<R>>>,
}

impl<R> ResultCache<R> {
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        let entries = match capacity {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self { entries }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<QueryResult<R>>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: CacheKey, result: Arc<QueryResult<R>>) {
        self.entries.put(key, result);
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
