//! Fixed-capacity blocking FIFO for producer/consumer hand-off.
//!
//! `put` parks while the buffer is full and `get` parks while it is empty.
//! Both sides wait on a `parking_lot::Condvar` tied to the buffer's own lock
//! with a predicate loop, and each success wakes one waiter of the opposite
//! side.
//!
//! Blocking calls are cancellable. The `*_cancellable` variants take an
//! explicit [`CancellationToken`]; plain [`put`](BoundedBuffer::put) and
//! [`get`](BoundedBuffer::get) observe the token of the pool task running on
//! the calling thread, so `WorkerPool::shutdown_now` releases workers parked
//! here.
//!
//! ```
//! use prometheus_thread_pool::buffer::BoundedBuffer;
//! use std::thread;
//!
//! let buffer = BoundedBuffer::new(2).unwrap();
//! let producer = {
//!     let buffer = buffer.clone();
//!     thread::spawn(move || {
//!         for i in 0..5 {
//!             buffer.put(i).unwrap();
//!         }
//!     })
//! };
//! let received: Vec<i32> = (0..5).map(|_| buffer.get().unwrap()).collect();
//! producer.join().unwrap();
//! assert_eq!(received, vec![0, 1, 2, 3, 4]);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::core::cancellation::{self, CancellationToken, WatchGuard};
use crate::core::error::PoolError;

/// A `put` that did not happen. Carries the item back to the caller.
#[derive(Debug)]
pub struct PutError<T> {
    /// The item that was not inserted.
    pub item: T,
    /// Why: `Cancelled`, `Timeout` or `QueueFull` (from `try_put`).
    pub reason: PoolError,
}

impl<T> PutError<T> {
    /// Recover the item.
    pub fn into_inner(self) -> T {
        self.item
    }
}

impl<T> fmt::Display for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "put failed: {}", self.reason)
    }
}

impl<T: fmt::Debug> std::error::Error for PutError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

struct Shared<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    not_full: Condvar,
    not_empty: Condvar,
}

/// Blocking bounded FIFO. Clones share the same buffer.
pub struct BoundedBuffer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for BoundedBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> BoundedBuffer<T> {
    /// Create a buffer holding at most `capacity` items.
    ///
    /// # Errors
    ///
    /// `PoolError::InvalidConfig` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::InvalidConfig(
                "buffer capacity must be greater than 0".into(),
            ));
        }
        Ok(Self {
            shared: Arc::new(Shared {
                items: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
            }),
        })
    }

    /// Append `item`, blocking while the buffer is full.
    ///
    /// # Errors
    ///
    /// `Cancelled` if the current pool task is cancelled while waiting.
    pub fn put(&self, item: T) -> Result<(), PutError<T>> {
        let token = cancellation::current();
        self.put_until(item, None, token.as_ref())
    }

    /// Like [`put`](Self::put), giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// `Timeout` if no slot frees up in time, or `Cancelled` as for `put`.
    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PutError<T>> {
        let token = cancellation::current();
        self.put_until(item, Instant::now().checked_add(timeout), token.as_ref())
    }

    /// Like [`put`](Self::put), cancelled through `token` instead of the
    /// current task's token.
    ///
    /// # Errors
    ///
    /// `Cancelled` once `token` fires while waiting.
    pub fn put_cancellable(&self, item: T, token: &CancellationToken) -> Result<(), PutError<T>> {
        self.put_until(item, None, Some(token))
    }

    /// Append `item` only if there is room right now.
    ///
    /// # Errors
    ///
    /// `QueueFull` if the buffer is full.
    pub fn try_put(&self, item: T) -> Result<(), PutError<T>> {
        let mut items = self.shared.items.lock();
        if items.len() >= self.shared.capacity {
            return Err(PutError {
                item,
                reason: PoolError::QueueFull,
            });
        }
        self.push(&mut items, item);
        Ok(())
    }

    /// Remove the head item, blocking while the buffer is empty.
    ///
    /// # Errors
    ///
    /// `Cancelled` if the current pool task is cancelled while waiting.
    pub fn get(&self) -> Result<T, PoolError> {
        let token = cancellation::current();
        self.get_until(None, token.as_ref())
    }

    /// Like [`get`](Self::get), giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// `Timeout` if nothing arrives in time, or `Cancelled` as for `get`.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T, PoolError> {
        let token = cancellation::current();
        self.get_until(Instant::now().checked_add(timeout), token.as_ref())
    }

    /// Like [`get`](Self::get), cancelled through `token`.
    ///
    /// # Errors
    ///
    /// `Cancelled` once `token` fires while waiting.
    pub fn get_cancellable(&self, token: &CancellationToken) -> Result<T, PoolError> {
        self.get_until(None, Some(token))
    }

    /// Remove the head item if there is one.
    #[must_use]
    pub fn try_get(&self) -> Option<T> {
        let mut items = self.shared.items.lock();
        self.pop(&mut items)
    }

    /// Items currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.items.lock().len()
    }

    /// Whether the buffer holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.items.lock().is_empty()
    }

    /// Whether the buffer is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.shared.items.lock().len() >= self.shared.capacity
    }

    /// Maximum number of buffered items.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    fn put_until(
        &self,
        item: T,
        deadline: Option<Instant>,
        token: Option<&CancellationToken>,
    ) -> Result<(), PutError<T>> {
        let _watch = token.map(|t| self.watch(t));
        let mut items = self.shared.items.lock();

        while items.len() >= self.shared.capacity {
            if let Err(reason) = Self::wait(&self.shared.not_full, &mut items, deadline, token) {
                if items.len() < self.shared.capacity {
                    // Hand a consumed wake-up to the next producer.
                    self.shared.not_full.notify_one();
                }
                return Err(PutError { item, reason });
            }
        }

        self.push(&mut items, item);
        Ok(())
    }

    fn get_until(
        &self,
        deadline: Option<Instant>,
        token: Option<&CancellationToken>,
    ) -> Result<T, PoolError> {
        let _watch = token.map(|t| self.watch(t));
        let mut items = self.shared.items.lock();

        loop {
            if let Some(item) = self.pop(&mut items) {
                return Ok(item);
            }
            if let Err(reason) = Self::wait(&self.shared.not_empty, &mut items, deadline, token) {
                if !items.is_empty() {
                    self.shared.not_empty.notify_one();
                }
                return Err(reason);
            }
        }
    }

    /// One wait step; the caller re-checks its predicate afterwards.
    fn wait(
        cond: &Condvar,
        items: &mut MutexGuard<'_, VecDeque<T>>,
        deadline: Option<Instant>,
        token: Option<&CancellationToken>,
    ) -> Result<(), PoolError> {
        if token.is_some_and(CancellationToken::is_cancelled) {
            return Err(PoolError::Cancelled);
        }
        match deadline {
            Some(deadline) => {
                if cond.wait_until(items, deadline).timed_out() {
                    return Err(PoolError::Timeout);
                }
            }
            None => cond.wait(items),
        }
        if token.is_some_and(CancellationToken::is_cancelled) {
            return Err(PoolError::Cancelled);
        }
        Ok(())
    }

    fn push(&self, items: &mut VecDeque<T>, item: T) {
        items.push_back(item);
        self.shared.not_empty.notify_one();
    }

    fn pop(&self, items: &mut VecDeque<T>) -> Option<T> {
        let item = items.pop_front()?;
        self.shared.not_full.notify_one();
        Some(item)
    }

    /// Wake every waiter when `token` fires.
    ///
    /// The watcher takes the buffer lock before notifying, so a waiter that
    /// checked the token and is about to park cannot miss the wake-up.
    fn watch(&self, token: &CancellationToken) -> WatchGuard {
        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        token.watch(Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                let _items = shared.items.lock();
                shared.not_full.notify_all();
                shared.not_empty.notify_all();
            }
        }))
    }
}

impl<T> fmt::Debug for BoundedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedBuffer")
            .field("len", &self.shared.items.lock().len())
            .field("capacity", &self.shared.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_zero_capacity_is_invalid() {
        assert!(matches!(
            BoundedBuffer::<u8>::new(0),
            Err(PoolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_fifo_and_bounds() {
        let buffer = BoundedBuffer::new(3).unwrap();
        for i in 0..3 {
            buffer.try_put(i).unwrap();
        }
        assert!(buffer.is_full());

        let rejected = buffer.try_put(99).unwrap_err();
        assert_eq!(rejected.reason, PoolError::QueueFull);
        assert_eq!(rejected.into_inner(), 99);

        assert_eq!(buffer.try_get(), Some(0));
        assert_eq!(buffer.try_get(), Some(1));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.capacity(), 3);
    }

    #[test]
    fn test_timeouts() {
        let buffer = BoundedBuffer::new(1).unwrap();
        assert_eq!(
            buffer.get_timeout(Duration::from_millis(20)),
            Err(PoolError::Timeout)
        );

        buffer.put("a").unwrap();
        let err = buffer
            .put_timeout("b", Duration::from_millis(20))
            .unwrap_err();
        assert_eq!(err.reason, PoolError::Timeout);
        assert_eq!(err.item, "b");
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_cancel_unblocks_get() {
        let buffer = BoundedBuffer::<u32>::new(1).unwrap();
        let token = CancellationToken::new();

        let waiter = {
            let buffer = buffer.clone();
            let token = token.clone();
            thread::spawn(move || buffer.get_cancellable(&token))
        };

        thread::sleep(Duration::from_millis(30));
        token.cancel();
        assert_eq!(waiter.join().unwrap(), Err(PoolError::Cancelled));
    }

    #[test]
    fn test_cancel_unblocks_put_and_returns_item() {
        let buffer = BoundedBuffer::new(1).unwrap();
        buffer.put(1_u32).unwrap();
        let token = CancellationToken::new();

        let waiter = {
            let buffer = buffer.clone();
            let token = token.clone();
            thread::spawn(move || buffer.put_cancellable(2, &token))
        };

        thread::sleep(Duration::from_millis(30));
        token.cancel();
        let err = waiter.join().unwrap().unwrap_err();
        assert_eq!(err.reason, PoolError::Cancelled);
        assert_eq!(err.item, 2);
        assert_eq!(buffer.try_get(), Some(1));
    }

    #[test]
    fn test_cancelled_token_does_not_block_fast_path() {
        let buffer = BoundedBuffer::new(1).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        buffer.put_cancellable(5, &token).unwrap();
        assert_eq!(buffer.get_cancellable(&token), Ok(5));
    }
}
