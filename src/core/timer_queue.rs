//! Time-ordered queue backing the scheduled pool.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

/// Wrapper ordering entries by due time (earliest first), FIFO within equal
/// due times.
struct TimedEntry<T> {
    due: Instant,
    seq: u64,
    item: T,
}

impl<T> PartialEq for TimedEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for TimedEntry<T> {}

impl<T> PartialOrd for TimedEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for TimedEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for the max-heap: earlier due wins, then lower sequence.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap keyed by `(due, seq)`.
///
/// The sequence number is assigned on push, so entries sharing a due time
/// pop in insertion order.
pub struct TimerQueue<T> {
    heap: BinaryHeap<TimedEntry<T>>,
    next_seq: u64,
}

impl<T> TimerQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Insert `item` due at `due`; returns its sequence number.
    pub fn push(&mut self, due: Instant, item: T) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(TimedEntry { due, seq, item });
        seq
    }

    /// Due time of the earliest entry.
    #[must_use]
    pub fn next_due(&self) -> Option<Instant> {
        self.heap.peek().map(|e| e.due)
    }

    /// Remove and return the earliest entry if it is due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, T)> {
        if self.heap.peek()?.due > now {
            return None;
        }
        self.heap.pop().map(|e| (e.due, e.item))
    }

    /// Remove every entry matching `remove` and return the removed items.
    pub fn drain_where<F>(&mut self, mut remove: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.heap.drain().partition(|e| remove(&e.item));
        self.heap.extend(kept);
        removed.into_iter().map(|e| e.item).collect()
    }

    /// Remove every entry, earliest first.
    pub fn drain_all(&mut self) -> Vec<T> {
        let mut entries = std::mem::take(&mut self.heap).into_sorted_vec();
        // Sorted ascending by `Ord`, which is reversed: latest first.
        entries.reverse();
        entries.into_iter().map(|e| e.item).collect()
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no entries are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
