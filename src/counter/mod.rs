//! Shared counters with interchangeable synchronization strategies.
//!
//! All four types implement [`Counter`]. Three of them never lose an
//! increment under contention; [`UnsyncCounter`] performs a split
//! read-modify-write and serves as the negative control proving the others
//! actually synchronize.
//!
//! # Key Features
//!
//! - **`UnsyncCounter`**: separate load and store, so concurrent increments race
//! - **`MutexCounter`**: the whole update runs under a `parking_lot::Mutex`
//! - **`LockCounter`**: explicit acquire/release through an RAII guard, with a
//!   bounded-wait acquire
//! - **`AtomicCounter`**: a single `fetch_add`
//!
//! Use [`contention::run_trial`] to measure a strategy under load.

pub mod contention;

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use serde::{Deserialize, Serialize};

use crate::core::error::PoolError;

pub use contention::{run_trial, run_trial_on_pool, ContentionReport};

/// Capability shared by every counter strategy.
pub trait Counter: Send + Sync {
    /// Add one.
    fn increment(&self);

    /// Current value.
    fn value(&self) -> i64;

    /// Set the value back to zero.
    fn reset(&self);

    /// Short label used in reports and benchmarks.
    fn strategy(&self) -> CounterStrategy;
}

/// The available synchronization strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterStrategy {
    /// No synchronization of the read-modify-write.
    Unsynchronized,
    /// Mutex-guarded method body.
    Mutex,
    /// Explicitly acquired lock.
    Lock,
    /// Atomic fetch-and-add.
    Atomic,
}

impl CounterStrategy {
    /// Every strategy, negative control first.
    pub const ALL: [Self; 4] = [Self::Unsynchronized, Self::Mutex, Self::Lock, Self::Atomic];

    /// Whether the strategy guarantees no lost updates.
    #[must_use]
    pub const fn is_synchronized(self) -> bool {
        !matches!(self, Self::Unsynchronized)
    }

    /// A fresh counter of this strategy.
    #[must_use]
    pub fn build(self) -> Box<dyn Counter> {
        match self {
            Self::Unsynchronized => Box::new(UnsyncCounter::new()),
            Self::Mutex => Box::new(MutexCounter::new()),
            Self::Lock => Box::new(LockCounter::new()),
            Self::Atomic => Box::new(AtomicCounter::new()),
        }
    }
}

impl fmt::Display for CounterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unsynchronized => "unsynchronized",
            Self::Mutex => "mutex",
            Self::Lock => "lock",
            Self::Atomic => "atomic",
        };
        f.write_str(name)
    }
}

/// Counter whose increment is a separate load and store.
///
/// Each access is individually atomic, so this is free of undefined
/// behaviour, but two threads can read the same value and both write back
/// `value + 1`, losing one update.
#[derive(Debug, Default)]
pub struct UnsyncCounter {
    value: AtomicI64,
}

impl UnsyncCounter {
    /// Counter starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: AtomicI64::new(0),
        }
    }
}

impl Counter for UnsyncCounter {
    fn increment(&self) {
        let current = self.value.load(Ordering::Relaxed);
        // Widen the window between read and write.
        std::hint::spin_loop();
        self.value.store(current + 1, Ordering::Relaxed);
    }

    fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }

    fn strategy(&self) -> CounterStrategy {
        CounterStrategy::Unsynchronized
    }
}

/// Counter whose methods run entirely under one mutex.
#[derive(Debug, Default)]
pub struct MutexCounter {
    value: Mutex<i64>,
}

impl MutexCounter {
    /// Counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: Mutex::new(0),
        }
    }
}

impl Counter for MutexCounter {
    fn increment(&self) {
        *self.value.lock() += 1;
    }

    fn value(&self) -> i64 {
        *self.value.lock()
    }

    fn reset(&self) {
        *self.value.lock() = 0;
    }

    fn strategy(&self) -> CounterStrategy {
        CounterStrategy::Mutex
    }
}

/// Counter guarded by an explicitly acquired, re-entrant lock.
///
/// [`acquire`](Self::acquire) hands out a [`HeldCounter`] guard; the lock is
/// released when the guard drops, on every exit path. The owning thread may
/// acquire again while holding it.
///
/// ```
/// use prometheus_thread_pool::counter::{Counter, LockCounter};
///
/// let counter = LockCounter::new();
/// {
///     let held = counter.acquire();
///     held.increment();
///     held.increment();
///     assert_eq!(held.value(), 2);
/// }
/// assert_eq!(counter.value(), 2);
/// ```
#[derive(Debug, Default)]
pub struct LockCounter {
    lock: ReentrantMutex<Cell<i64>>,
}

impl LockCounter {
    /// Counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lock: ReentrantMutex::new(Cell::new(0)),
        }
    }

    /// Block until the lock is held.
    #[must_use]
    pub fn acquire(&self) -> HeldCounter<'_> {
        HeldCounter {
            guard: self.lock.lock(),
        }
    }

    /// Try to take the lock, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// `PoolError::Timeout` if another thread kept the lock.
    pub fn try_acquire_for(&self, timeout: Duration) -> Result<HeldCounter<'_>, PoolError> {
        self.lock
            .try_lock_for(timeout)
            .map(|guard| HeldCounter { guard })
            .ok_or(PoolError::Timeout)
    }
}

impl Counter for LockCounter {
    fn increment(&self) {
        self.acquire().increment();
    }

    fn value(&self) -> i64 {
        self.acquire().value()
    }

    fn reset(&self) {
        self.acquire().set(0);
    }

    fn strategy(&self) -> CounterStrategy {
        CounterStrategy::Lock
    }
}

/// Exclusive access to a [`LockCounter`]; releases the lock on drop.
pub struct HeldCounter<'a> {
    guard: ReentrantMutexGuard<'a, Cell<i64>>,
}

impl HeldCounter<'_> {
    /// Add one.
    pub fn increment(&self) {
        self.add(1);
    }

    /// Add `delta`.
    pub fn add(&self, delta: i64) {
        self.guard.set(self.guard.get() + delta);
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.guard.get()
    }

    /// Overwrite the value.
    pub fn set(&self, value: i64) {
        self.guard.set(value);
    }
}

impl fmt::Debug for HeldCounter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeldCounter")
            .field("value", &self.value())
            .finish()
    }
}

/// Lock-free counter; every increment is one `fetch_add`.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicI64,
}

impl AtomicCounter {
    /// Counter starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: AtomicI64::new(0),
        }
    }

    /// Add one and return the new value.
    pub fn increment_and_get(&self) -> i64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Counter for AtomicCounter {
    fn increment(&self) {
        self.value.fetch_add(1, Ordering::AcqRel);
    }

    fn value(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.value.store(0, Ordering::Release);
    }

    fn strategy(&self) -> CounterStrategy {
        CounterStrategy::Atomic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_thread_semantics() {
        for strategy in CounterStrategy::ALL {
            let counter = strategy.build();
            for _ in 0..10 {
                counter.increment();
            }
            assert_eq!(counter.value(), 10, "{strategy}");
            counter.reset();
            assert_eq!(counter.value(), 0, "{strategy}");
            assert_eq!(counter.strategy(), strategy);
        }
    }

    #[test]
    fn test_lock_counter_is_reentrant() {
        let counter = LockCounter::new();
        let outer = counter.acquire();
        outer.increment();
        // Same thread: the trait method re-acquires without deadlocking.
        counter.increment();
        assert_eq!(outer.value(), 2);
    }

    #[test]
    fn test_lock_counter_try_acquire_times_out() {
        let counter = std::sync::Arc::new(LockCounter::new());
        let held = counter.acquire();

        let other = std::sync::Arc::clone(&counter);
        let result = std::thread::spawn(move || {
            other
                .try_acquire_for(Duration::from_millis(20))
                .map(|held| held.value())
        })
        .join()
        .unwrap();
        assert_eq!(result, Err(PoolError::Timeout));
        drop(held);

        assert!(counter.try_acquire_for(Duration::from_millis(20)).is_ok());
    }

    #[test]
    fn test_atomic_increment_and_get() {
        let counter = AtomicCounter::new();
        assert_eq!(counter.increment_and_get(), 1);
        assert_eq!(counter.increment_and_get(), 2);
    }

    #[test]
    fn test_strategy_serde() {
        let json = serde_json::to_string(&CounterStrategy::Unsynchronized).unwrap();
        assert_eq!(json, "\"unsynchronized\"");
        assert!(!CounterStrategy::Unsynchronized.is_synchronized());
        assert!(CounterStrategy::Atomic.is_synchronized());
    }
}
