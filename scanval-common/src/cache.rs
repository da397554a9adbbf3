//! Bounded response cache
//!
//! Shared across concurrent runs. Entries are evicted oldest-first once the
//! size ceiling is reached. A capacity of zero disables caching.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use tokio::sync::Mutex;

struct CacheInner<K, V> {
    entries: HashMap<K, V>,
    /// Insertion order, oldest at the front
    order: VecDeque<K>,
}

/// Bounded insertion-ordered cache safe for concurrent reads and inserts
pub struct ResponseCache<K, V> {
    capacity: usize,
    inner: Mutex<CacheInner<K, V>>,
}

impl<K, V> ResponseCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
        }
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a cached value
    pub async fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().await.entries.get(key).cloned()
    }

    /// Insert or replace a value
    ///
    /// Replacing keeps the entry's original position in the eviction order.
    pub async fn insert(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.entries.get_mut(&key) {
            *existing = value;
            return;
        }

        while inner.order.len() >= self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(key, value);
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Whether the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
