//! Bounded FIFO result cache.
//!
//! Eviction is strictly by insertion order. Reads never promote an entry,
//! and overwriting an existing key keeps its original position.

use std::collections::{HashMap, VecDeque};

/// Capacity of the process-wide diagnosis cache.
pub const RESULT_CACHE_CAPACITY: usize = 1000;

pub struct FifoCache<V> {
    max_entries: usize,
    entries: HashMap<String, V>,
    order: VecDeque<String>,
}

impl<V: Clone> FifoCache<V> {
    /// A capacity of zero is raised to one.
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            max_entries,
            entries: HashMap::with_capacity(max_entries),
            order: VecDeque::with_capacity(max_entries),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a value, returning the evicted key if the cache overflowed.
    pub fn insert(&mut self, key: String, value: V) -> Option<String> {
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = value;
            return None;
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, value);

        if self.entries.len() > self.max_entries {
            let victim = self.order.pop_front()?;
            self.entries.remove(&victim);
            tracing::trace!("Evicted {} from result cache", victim);
            return Some(victim);
        }
        None
    }

    /// Replace the value of an existing key in place.
    pub fn update<F>(&mut self, key: &str, f: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        match self.entries.get_mut(key) {
            Some(value) => {
                f(value);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_insert_first() {
        let mut cache = FifoCache::new(3);
        assert_eq!(cache.insert("a".into(), 1), None);
        assert_eq!(cache.insert("b".into(), 2), None);
        assert_eq!(cache.insert("c".into(), 3), None);
        assert_eq!(cache.insert("d".into(), 4), Some("a".to_string()));
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("a"));
        assert_eq!(cache.get("d"), Some(4));
    }

    #[test]
    fn test_reads_do_not_promote() {
        let mut cache = FifoCache::new(2);
        cache.insert("a".into(), 1);
        cache.insert("b".into(), 2);
        for _ in 0..10 {
            assert_eq!(cache.get("a"), Some(1));
        }
        cache.insert("c".into(), 3);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut cache = FifoCache::new(2);
        cache.insert("a".into(), 1);
        cache.insert("b".into(), 2);
        assert_eq!(cache.insert("a".into(), 10), None);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.insert("c".into(), 3), Some("a".to_string()));
    }

    #[test]
    fn test_default_capacity_boundary() {
        let mut cache = FifoCache::new(RESULT_CACHE_CAPACITY);
        for i in 0..=RESULT_CACHE_CAPACITY {
            cache.insert(format!("id-{}", i), i);
        }
        assert_eq!(cache.len(), RESULT_CACHE_CAPACITY);
        assert!(!cache.contains("id-0"));
        assert!(cache.contains("id-1"));
        assert!(cache.contains(&format!("id-{}", RESULT_CACHE_CAPACITY)));
    }

    #[test]
    fn test_update_in_place() {
        let mut cache = FifoCache::new(2);
        cache.insert("a".into(), 1);
        assert!(cache.update("a", |v| *v += 1));
        assert!(!cache.update("missing", |v| *v += 1));
        assert_eq!(cache.get("a"), Some(2));
        assert_eq!(FifoCache::<u8>::new(0).capacity(), 1);
    }
}
