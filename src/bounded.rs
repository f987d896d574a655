// src/bounded.rs
//! Fixed-capacity FIFO collection
//!
//! Used for the session log and the map point buffer. Pushing into a full
//! collection evicts the oldest element.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    items: VecDeque<T>,
    capacity: usize,
    evicted: u64,
}

impl<T> BoundedLog<T> {
    /// A zero capacity is bumped to one so the log can always hold the latest item.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// Append an item, returning the evicted oldest item if the log was full
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.evicted += 1;
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Total number of items dropped to make room since creation or the last clear
    pub fn evicted_count(&self) -> u64 {
        self.evicted
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.evicted = 0;
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// The `n` newest items, newest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        self.items.iter().rev().take(n)
    }

    /// The `n` newest items, newest first, mutably
    pub fn recent_mut(&mut self, n: usize) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut().rev().take(n)
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn retain<F: FnMut(&T) -> bool>(&mut self, f: F) {
        self.items.retain(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_capacity() {
        let mut log = BoundedLog::new(3);
        assert_eq!(log.push(1), None);
        assert_eq!(log.push(2), None);
        assert_eq!(log.len(), 2);
        assert!(!log.is_full());
    }

    #[test]
    fn test_fifo_eviction() {
        let mut log = BoundedLog::new(3);
        for i in 1..=3 {
            log.push(i);
        }
        assert!(log.is_full());
        assert_eq!(log.push(4), Some(1));
        assert_eq!(log.push(5), Some(2));
        assert_eq!(log.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(log.evicted_count(), 2);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut log = BoundedLog::new(10);
        for i in 1..=5 {
            log.push(i);
        }
        assert_eq!(log.recent(2).copied().collect::<Vec<_>>(), vec![5, 4]);
        assert_eq!(log.recent(50).count(), 5);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut log = BoundedLog::new(0);
        log.push("a");
        log.push("b");
        assert_eq!(log.len(), 1);
        assert_eq!(log.last(), Some(&"b"));
    }

    #[test]
    fn test_clear_resets() {
        let mut log = BoundedLog::new(1);
        log.push(1);
        log.push(2);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.evicted_count(), 0);
    }
}
