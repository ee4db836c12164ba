//! Global eviction priority structure.
//!
//! Uses index-based separation:
//! - a `BTreeSet` orders lightweight `(priority, ticket, key)` entries
//! - a `Slab` stores the entries themselves
//!
//! Handles stay valid across unrelated inserts/removals, so window neighbours
//! can address each other by key.

use std::collections::BTreeSet;
use std::fmt;

use ordered_float::OrderedFloat;
use slab::Slab;

/// Stable handle to a queued entry
pub type EntryKey = usize;

#[derive(Debug)]
struct Slot<T> {
    value: T,
    priority: OrderedFloat<f64>,
    ticket: u64,
}

/// Min-priority structure with handle-based update and removal.
///
/// Equal priorities pop in the order they were last (re)prioritized, which
/// keeps eviction deterministic for identical input.
pub struct EvictionQueue<T> {
    /// Ordered index (priority, ticket, slab key)
    order: BTreeSet<(OrderedFloat<f64>, u64, EntryKey)>,
    /// Entry storage
    storage: Slab<Slot<T>>,
    next_ticket: u64,
}

impl<T> fmt::Debug for EvictionQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvictionQueue")
            .field("len", &self.storage.len())
            .field("min", &self.peek_min().map(|(_, _, p)| p))
            .finish()
    }
}

impl<T> Default for EvictionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EvictionQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: BTreeSet::new(),
            storage: Slab::with_capacity(capacity),
            next_ticket: 0,
        }
    }

    #[inline]
    fn ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    /// Insert an entry, returning its handle
    pub fn insert(&mut self, value: T, priority: f64) -> EntryKey {
        let priority = OrderedFloat(priority);
        let ticket = self.ticket();
        let key = self.storage.insert(Slot {
            value,
            priority,
            ticket,
        });
        self.order.insert((priority, ticket, key));
        key
    }

    /// Remove an entry by handle
    pub fn remove(&mut self, key: EntryKey) -> Option<(T, f64)> {
        let slot = self.storage.try_remove(key)?;
        self.order.remove(&(slot.priority, slot.ticket, key));
        Some((slot.value, slot.priority.0))
    }

    /// Remove and return the minimum-priority entry
    pub fn pop_min(&mut self) -> Option<(EntryKey, T, f64)> {
        let (_, _, key) = self.order.pop_first()?;
        let slot = self.storage.remove(key);
        Some((key, slot.value, slot.priority.0))
    }

    /// Minimum-priority entry without removing it
    pub fn peek_min(&self) -> Option<(EntryKey, &T, f64)> {
        let &(priority, _, key) = self.order.first()?;
        self.storage.get(key).map(|slot| (key, &slot.value, priority.0))
    }

    /// Smallest priority currently queued
    #[inline]
    pub fn min_priority(&self) -> Option<f64> {
        self.order.first().map(|(p, _, _)| p.0)
    }

    /// Replace an entry's priority. Returns false for an unknown handle.
    pub fn set_priority(&mut self, key: EntryKey, priority: f64) -> bool {
        let ticket = self.ticket();
        let Some(slot) = self.storage.get_mut(key) else {
            return false;
        };
        self.order.remove(&(slot.priority, slot.ticket, key));
        slot.priority = OrderedFloat(priority);
        slot.ticket = ticket;
        self.order.insert((slot.priority, ticket, key));
        true
    }

    #[inline]
    pub fn priority(&self, key: EntryKey) -> Option<f64> {
        self.storage.get(key).map(|slot| slot.priority.0)
    }

    #[inline]
    pub fn get(&self, key: EntryKey) -> Option<&T> {
        self.storage.get(key).map(|slot| &slot.value)
    }

    #[inline]
    pub fn get_mut(&mut self, key: EntryKey) -> Option<&mut T> {
        self.storage.get_mut(key).map(|slot| &mut slot.value)
    }

    #[inline]
    pub fn contains(&self, key: EntryKey) -> bool {
        self.storage.contains(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Entries in ascending priority order
    pub fn iter(&self) -> impl Iterator<Item = (EntryKey, &T, f64)> + '_ {
        self.order
            .iter()
            .filter_map(|&(p, _, key)| self.storage.get(key).map(|slot| (key, &slot.value, p.0)))
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.order.clear();
        self.storage.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_min_order() {
        let mut queue = EvictionQueue::new();
        queue.insert("c", 3.0);
        queue.insert("a", 1.0);
        queue.insert("b", 2.0);

        let popped: Vec<_> = std::iter::from_fn(|| queue.pop_min().map(|(_, v, _)| v)).collect();
        assert_eq!(popped, vec!["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_ties_pop_in_insertion_order() {
        let mut queue = EvictionQueue::new();
        queue.insert(1, 5.0);
        queue.insert(2, 5.0);
        queue.insert(3, 5.0);

        assert_eq!(queue.pop_min().map(|(_, v, _)| v), Some(1));
        assert_eq!(queue.pop_min().map(|(_, v, _)| v), Some(2));
    }

    #[test]
    fn test_set_priority_reorders() {
        let mut queue = EvictionQueue::new();
        let a = queue.insert("a", 1.0);
        queue.insert("b", 2.0);

        assert!(queue.set_priority(a, 10.0));
        assert_eq!(queue.priority(a), Some(10.0));
        assert_eq!(queue.peek_min().map(|(_, v, _)| *v), Some("b"));
    }

    #[test]
    fn test_remove_by_handle() {
        let mut queue = EvictionQueue::new();
        let a = queue.insert("a", 1.0);
        let b = queue.insert("b", 2.0);

        assert_eq!(queue.remove(a), Some(("a", 1.0)));
        assert_eq!(queue.remove(a), None);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get(b), Some(&"b"));
        assert!(!queue.set_priority(a, 0.0));
    }

    #[test]
    fn test_infinite_priorities_sort_last() {
        let mut queue = EvictionQueue::new();
        queue.insert("inf", f64::INFINITY);
        queue.insert("newest", 1e20);
        queue.insert("low", 0.5);

        let order: Vec<_> = queue.iter().map(|(_, v, _)| *v).collect();
        assert_eq!(order, vec!["low", "newest", "inf"]);
        assert_eq!(queue.min_priority(), Some(0.5));
    }

    #[test]
    fn test_handles_survive_other_removals() {
        let mut queue = EvictionQueue::new();
        let keys: Vec<_> = (0..10).map(|i| queue.insert(i, i as f64)).collect();
        for &k in keys.iter().step_by(2) {
            queue.remove(k);
        }
        for &k in keys.iter().skip(1).step_by(2) {
            assert_eq!(queue.get(k).copied(), Some(k as i32));
        }
    }
}
