//! Bounded least-recently-used cache for expanded paths.
//!
//! Lookups take the shared lock and bump an atomic recency tick, so many
//! readers proceed in parallel. Only inserts take the exclusive lock.

use std::{
    collections::HashMap,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug)]
struct Entry {
    value: String,
    last_used: AtomicU64,
}

#[derive(Debug)]
pub struct PathCache {
    capacity: usize,
    clock: AtomicU64,
    entries: RwLock<HashMap<String, Entry>>,
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PathCache {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        entry.last_used.store(self.tick(), Ordering::Relaxed);
        Some(entry.value.clone())
    }

    /// Insert or refresh `key`, evicting the least recently used entry when full.
    pub fn insert(&self, key: &str, value: String) {
        let tick = self.tick();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if !entries.contains_key(key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used.load(Ordering::Relaxed))
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                trace!("path cache evicting {oldest}");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                value,
                last_used: AtomicU64::new(tick),
            },
        );
    }

    /// Cached value for `key`, computing and inserting it on a miss.
    pub fn get_or_insert_with(&self, key: &str, compute: impl FnOnce() -> String) -> String {
        if let Some(v) = self.get(key) {
            return v;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_hit_and_miss() {
        let cache = PathCache::default();
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
        assert!(cache.get("~/a").is_none());

        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let v = cache.get_or_insert_with("~/a", || {
                calls.fetch_add(1, Ordering::SeqCst);
                "/home/u/a".to_string()
            });
            assert_eq!(v, "/home/u/a");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = PathCache::new(2);
        cache.insert("a", "A".into());
        cache.insert("b", "B".into());
        // Touch "a" so "b" becomes the oldest.
        assert_eq!(cache.get("a").as_deref(), Some("A"));
        cache.insert("c", "C".into());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_refresh_does_not_evict() {
        let cache = PathCache::new(2);
        cache.insert("a", "A".into());
        cache.insert("b", "B".into());
        cache.insert("a", "A2".into());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").as_deref(), Some("A2"));
        assert_eq!(cache.get("b").as_deref(), Some("B"));
    }

    #[test]
    fn test_bounded() {
        let cache = PathCache::new(DEFAULT_CAPACITY);
        for i in 0..(DEFAULT_CAPACITY + 50) {
            cache.insert(&format!("k{i}"), i.to_string());
        }
        assert_eq!(cache.len(), DEFAULT_CAPACITY);
        assert!(cache.get("k0").is_none());
        assert!(cache.get(&format!("k{}", DEFAULT_CAPACITY + 49)).is_some());
    }

    #[test]
    fn test_concurrent_readers() {
        let cache = PathCache::new(64);
        for i in 0..32 {
            cache.insert(&format!("k{i}"), format!("v{i}"));
        }
        std::thread::scope(|s| {
            for t in 0..8 {
                let cache = &cache;
                s.spawn(move || {
                    for i in 0..32 {
                        let key = format!("k{}", (i + t) % 32);
                        let v = cache.get_or_insert_with(&key, || unreachable!());
                        assert_eq!(v, format!("v{}", (i + t) % 32));
                    }
                });
            }
        });
        assert_eq!(cache.len(), 32);
    }
}
