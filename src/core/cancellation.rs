//! Cooperative cancellation signal shared between pools, tasks and blocking
//! primitives.
//!
//! A [`CancellationToken`] is a cheap, clonable flag. Setting it never
//! interrupts anything by force: running tasks poll [`is_cancelled`], and
//! blocking primitives such as [`BoundedBuffer`](crate::buffer::BoundedBuffer)
//! register a watcher so that a parked thread is woken as soon as the token
//! fires.
//!
//! While a pool worker executes a task, the task's token is installed as the
//! *current* token of that thread. Code running inside the task can observe it
//! through [`current`] or [`is_cancelled`] without threading it through every
//! call.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Watcher = Arc<dyn Fn() + Send + Sync>;

struct Watchers {
    next_id: u64,
    entries: Vec<(u64, Watcher)>,
}

struct Inner {
    cancelled: AtomicBool,
    watchers: Mutex<Watchers>,
}

/// A clonable, thread-safe cancellation flag.
///
/// # Examples
///
/// ```
/// use prometheus_thread_pool::core::CancellationToken;
///
/// let token = CancellationToken::new();
/// let observer = token.clone();
/// assert!(!observer.is_cancelled());
///
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Create a token in the non-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                watchers: Mutex::new(Watchers {
                    next_id: 0,
                    entries: Vec::new(),
                }),
            }),
        }
    }

    /// Request cancellation.
    ///
    /// Returns `true` if this call flipped the token, `false` if it was
    /// already cancelled. Registered watchers run exactly once, on the
    /// calling thread, after the flag is visible.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }

        // Run watchers outside the registry lock: they take other locks.
        let watchers: Vec<Watcher> = {
            let mut registry = self.inner.watchers.lock();
            registry.entries.drain(..).map(|(_, w)| w).collect()
        };
        for watcher in watchers {
            watcher();
        }
        true
    }

    /// Whether cancellation has been requested.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Register a callback fired when the token is cancelled.
    ///
    /// The callback is removed when the returned guard is dropped. If the
    /// token is already cancelled the callback is not invoked; callers must
    /// re-check [`is_cancelled`](Self::is_cancelled) after registering.
    pub(crate) fn watch(&self, watcher: Watcher) -> WatchGuard {
        let mut registry = self.inner.watchers.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, watcher));
        WatchGuard {
            inner: Arc::clone(&self.inner),
            id,
        }
    }

    /// Whether both handles refer to the same underlying flag.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Deregisters a watcher on drop.
pub(crate) struct WatchGuard {
    inner: Arc<Inner>,
    id: u64,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        let mut registry = self.inner.watchers.lock();
        registry.entries.retain(|(id, _)| *id != self.id);
    }
}

thread_local! {
    static CURRENT: RefCell<Option<CancellationToken>> = const { RefCell::new(None) };
}

/// The token of the pool task currently executing on this thread, if any.
#[must_use]
pub fn current() -> Option<CancellationToken> {
    CURRENT.with(|slot| slot.borrow().clone())
}

/// Whether the pool task running on this thread has been asked to stop.
///
/// Always `false` outside of a pool worker.
#[must_use]
pub fn is_cancelled() -> bool {
    CURRENT.with(|slot| {
        slot.borrow()
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    })
}

/// Install `token` as the current token until the guard drops.
pub(crate) fn enter(token: CancellationToken) -> CurrentGuard {
    let previous = CURRENT.with(|slot| slot.borrow_mut().replace(token));
    CurrentGuard { previous }
}

/// Restores the previously installed token on drop.
pub(crate) struct CurrentGuard {
    previous: Option<CancellationToken>,
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|slot| *slot.borrow_mut() = previous);
    }
}
