//! Least-recently-used ordering over a node's neighbors.

use std::collections::VecDeque;

/// Recency queue of neighbor indices. The front of the queue is the
/// least recently used entry; pushing an index that is already present
/// moves it to the most-recent end instead of duplicating it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LruQueue {
    entries: VecDeque<usize>,
}

impl LruQueue {
    pub fn new() -> Self {
        LruQueue {
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains(&index)
    }

    /// Mark `index` as most recently used.
    pub fn push(&mut self, index: usize) {
        self.remove(index);
        self.entries.push_back(index);
    }

    /// Insert `index` as the least recently used entry.
    pub fn push_least(&mut self, index: usize) {
        self.remove(index);
        self.entries.push_front(index);
    }

    /// Remove and return the least recently used entry.
    pub fn pop(&mut self) -> Option<usize> {
        self.entries.pop_front()
    }

    /// Least recently used entry without removing it.
    pub fn peek_least(&self) -> Option<usize> {
        self.entries.front().copied()
    }

    pub fn remove(&mut self, index: usize) {
        if let Some(pos) = self.entries.iter().position(|&e| e == index) {
            self.entries.remove(pos);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_moves_existing_to_most_recent() {
        let mut q = LruQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        q.push(1);
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn push_least_goes_to_front() {
        let mut q = LruQueue::new();
        q.push(1);
        q.push(2);
        q.push_least(3);
        assert_eq!(q.peek_least(), Some(3));
        assert_eq!(q.len(), 3);
        // Re-inserting an existing entry as least recent moves it.
        q.push_least(2);
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
        assert_eq!(q.pop(), Some(1));
    }

    #[test]
    fn remove_is_a_no_op_when_absent() {
        let mut q = LruQueue::new();
        q.push(5);
        q.remove(7);
        assert_eq!(q.len(), 1);
        q.remove(5);
        assert!(q.is_empty());
    }
}
