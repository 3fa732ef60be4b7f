//! Delayed and periodic execution on top of [`WorkerPool`].
//!
//! A dedicated timer thread owns a [`TimerQueue`] and does one thing: when an
//! entry falls due it is submitted to the inner pool's queue. Task bodies
//! always run on pool workers, so a slow task never delays the timer.
//!
//! Periodic tasks are re-armed by the worker that just ran them, after the
//! body returns. That is what guarantees firings of one task never overlap.
//!
//! # Example
//!
//! ```
//! use prometheus_thread_pool::config::WorkerPoolConfig;
//! use prometheus_thread_pool::core::ScheduledWorkerPool;
//! use std::time::Duration;
//!
//! let pool = ScheduledWorkerPool::new(WorkerPoolConfig::fixed(2)).unwrap();
//! let handle = pool
//!     .schedule(|| "later", Duration::from_millis(10))
//!     .unwrap();
//! assert_eq!(handle.join().unwrap(), "later");
//! pool.shutdown();
//! assert!(pool.await_termination(Duration::from_secs(5)));
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::config::WorkerPoolConfig;

use super::cancellation::{CancellationToken, WatchGuard};
use super::error::PoolError;
use super::events::TaskListener;
use super::lifecycle::PoolState;
use super::task::{
    panic_message, result_slot, Outcome, StatusCell, Task, TaskHandle, TaskId, TaskStatus,
};
use super::timer_queue::TimerQueue;
use super::worker_pool::{PoolShared, PoolStats, WorkerPool};

/// How a periodic task computes its next due time.
#[derive(Debug, Clone, Copy)]
enum Cadence {
    /// Grid `start + k * period`, independent of execution time.
    FixedRate { start: Instant, period: Duration },
    /// `delay` after the previous firing completed.
    FixedDelay { delay: Duration },
}

struct OneShot {
    task: Task,
    token: CancellationToken,
    status: StatusCell,
    reply: Sender<Outcome>,
    _watch: WatchGuard,
}

type PeriodicBody = Box<dyn FnMut() + Send + 'static>;

struct Periodic {
    id: TaskId,
    body: Mutex<PeriodicBody>,
    cadence: Cadence,
    /// Grid index of the firing that ran last (fixed-rate only).
    tick: Mutex<u64>,
    firings: Arc<AtomicU64>,
    token: CancellationToken,
    status: StatusCell,
    /// Dropped with the task, which resolves the handle as `Cancelled`.
    reply: Mutex<Option<Sender<Outcome>>>,
    _watch: WatchGuard,
}

enum Entry {
    OneShot(OneShot),
    Periodic(Arc<Periodic>),
}

impl Entry {
    fn token(&self) -> &CancellationToken {
        match self {
            Self::OneShot(o) => &o.token,
            Self::Periodic(p) => &p.token,
        }
    }

    fn status(&self) -> &StatusCell {
        match self {
            Self::OneShot(o) => &o.status,
            Self::Periodic(p) => &p.status,
        }
    }
}

struct TimerState {
    queue: TimerQueue<Entry>,
    /// Graceful shutdown requested: nothing new is armed, periodic entries
    /// are gone, accepted one-shots still fire.
    draining: bool,
    /// Nothing more is dispatched; the timer thread exits.
    closed: bool,
    /// Due entries popped by the timer thread and not yet handed to the pool.
    dispatching: bool,
    /// Whether this timer keeps the inner pool from terminating.
    holding: bool,
}

impl TimerState {
    const fn is_shut_down(&self) -> bool {
        self.draining || self.closed
    }
}

struct TimerShared {
    name: String,
    pool: Arc<PoolShared>,
    state: Mutex<TimerState>,
    wakeup: Condvar,
    next_id: AtomicU64,
}

/// Worker pool with delayed, fixed-rate and fixed-delay submission.
///
/// A graceful shutdown stops periodic tasks but still runs every delayed task
/// it already accepted, when it falls due. A forced shutdown discards them.
pub struct ScheduledWorkerPool {
    pool: WorkerPool,
    timer: Arc<TimerShared>,
    timer_thread: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduledWorkerPool {
    /// Create a scheduled pool whose workers follow `config`.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Spawn` if a worker or the timer thread cannot be started
    pub fn new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        Self::build(config, None, None)
    }

    /// Create a scheduled pool reporting task outcomes to `listener`.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_listener(
        config: WorkerPoolConfig,
        listener: Arc<dyn TaskListener>,
    ) -> Result<Self, PoolError> {
        Self::build(config, None, Some(listener))
    }

    pub(crate) fn build(
        config: WorkerPoolConfig,
        name: Option<String>,
        listener: Option<Arc<dyn TaskListener>>,
    ) -> Result<Self, PoolError> {
        let pool = WorkerPool::build(config, name, listener)?;
        let timer = Arc::new(TimerShared {
            name: pool.name().to_string(),
            pool: Arc::clone(pool.shared()),
            state: Mutex::new(TimerState {
                queue: TimerQueue::new(),
                draining: false,
                closed: false,
                dispatching: false,
                holding: false,
            }),
            wakeup: Condvar::new(),
            next_id: AtomicU64::new(0),
        });

        let thread_timer = Arc::clone(&timer);
        let timer_thread = thread::Builder::new()
            .name(format!("{}-timer", pool.config().thread_name_prefix))
            .spawn(move || run_timer(&thread_timer))
            .map_err(|e| {
                pool.shutdown_now();
                PoolError::Spawn(e.to_string())
            })?;

        info!(pool = %timer.name, "ScheduledWorkerPool initialized");

        Ok(Self {
            pool,
            timer,
            timer_thread: Mutex::new(Some(timer_thread)),
        })
    }

    /// Run `f` once, `delay` from now.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if `delay` reaches past the clock's range
    /// - `PoolError::Rejected` if the pool has been shut down
    pub fn schedule<R, F>(&self, f: F, delay: Duration) -> Result<ScheduledHandle<R>, PoolError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        self.schedule_task(Task::computed(f), delay)
    }

    /// Run a pre-built [`Task`] once, `delay` from now. `R` must match the
    /// task's output type.
    ///
    /// # Errors
    ///
    /// Same as [`schedule`](Self::schedule).
    pub fn schedule_task<R: Send + 'static>(
        &self,
        task: Task,
        delay: Duration,
    ) -> Result<ScheduledHandle<R>, PoolError> {
        let due = instant_after(Instant::now(), delay)?;
        let id = self.timer.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let status = StatusCell::new();
        let (tx, rx) = result_slot();
        let entry = Entry::OneShot(OneShot {
            task,
            token: token.clone(),
            status: status.clone(),
            reply: tx,
            _watch: self.timer.watch(&token),
        });

        self.timer.arm(due, entry)?;
        debug!(pool = %self.timer.name, task_id = id, ?delay, "One-shot task scheduled");
        Ok(ScheduledHandle {
            inner: TaskHandle::new(id, token, status, rx),
            firings: None,
        })
    }

    /// Run `f` at `initial_delay + k * period` for k = 0, 1, 2, ...
    ///
    /// A firing that overruns its period is followed immediately by the next
    /// one; after that the schedule resumes on the original grid, skipping
    /// the ticks that were missed. Firings never overlap. A panicking firing
    /// stops the schedule and fails the handle.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if `period` is zero, or `initial_delay`
    ///   plus one `period` reaches past the clock's range
    /// - `PoolError::Rejected` if the pool has been shut down
    pub fn schedule_at_fixed_rate<F>(
        &self,
        f: F,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<ScheduledHandle<()>, PoolError>
    where
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            return Err(PoolError::InvalidConfig("period must be greater than 0".into()));
        }
        let start = instant_after(Instant::now(), initial_delay)?;
        instant_after(start, period)?;
        self.schedule_periodic(Box::new(f), start, Cadence::FixedRate { start, period })
    }

    /// Run `f` after `initial_delay`, then `delay` after each firing completes.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if `delay` is zero, or `initial_delay`
    ///   plus `delay` reaches past the clock's range
    /// - `PoolError::Rejected` if the pool has been shut down
    pub fn schedule_with_fixed_delay<F>(
        &self,
        f: F,
        initial_delay: Duration,
        delay: Duration,
    ) -> Result<ScheduledHandle<()>, PoolError>
    where
        F: FnMut() + Send + 'static,
    {
        if delay.is_zero() {
            return Err(PoolError::InvalidConfig("delay must be greater than 0".into()));
        }
        let start = instant_after(Instant::now(), initial_delay)?;
        instant_after(start, delay)?;
        self.schedule_periodic(Box::new(f), start, Cadence::FixedDelay { delay })
    }

    fn schedule_periodic(
        &self,
        body: PeriodicBody,
        first_due: Instant,
        cadence: Cadence,
    ) -> Result<ScheduledHandle<()>, PoolError> {
        let id = self.timer.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let status = StatusCell::new();
        let firings = Arc::new(AtomicU64::new(0));
        let (tx, rx) = result_slot();
        let periodic = Arc::new(Periodic {
            id,
            body: Mutex::new(body),
            cadence,
            tick: Mutex::new(0),
            firings: Arc::clone(&firings),
            token: token.clone(),
            status: status.clone(),
            reply: Mutex::new(Some(tx)),
            _watch: self.timer.watch(&token),
        });

        self.timer.arm(first_due, Entry::Periodic(periodic))?;
        debug!(pool = %self.timer.name, task_id = id, ?cadence, "Periodic task scheduled");
        Ok(ScheduledHandle {
            inner: TaskHandle::new(id, token, status, rx),
            firings: Some(firings),
        })
    }

    /// Submit a closure for immediate execution.
    ///
    /// # Errors
    ///
    /// Same as [`WorkerPool::submit`].
    pub fn submit<R, F>(&self, f: F) -> Result<TaskHandle<R>, PoolError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        self.pool.submit(f)
    }

    /// Submit a closure for immediate execution, for its side effects only.
    ///
    /// # Errors
    ///
    /// Same as [`WorkerPool::execute`].
    pub fn execute<F>(&self, f: F) -> Result<TaskHandle<()>, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.execute(f)
    }

    /// Stop accepting work and shut down gracefully. Idempotent.
    ///
    /// Periodic schedules end and their handles resolve to `Cancelled`.
    /// Delayed tasks already accepted still fire when due, and the inner pool
    /// terminates only after the last of them has run.
    pub fn shutdown(&self) {
        for entry in self.timer.drain() {
            entry.token().cancel();
            entry.status().cancel_if_pending();
        }
        self.pool.shutdown();
    }

    /// Stop the timer and force-stop the inner pool.
    ///
    /// Pending delayed tasks are discarded and resolve to `Cancelled`. Returns
    /// those that never fired followed by the inner pool's unstarted tasks.
    pub fn shutdown_now(&self) -> Vec<Task> {
        let mut unstarted: Vec<Task> = self
            .timer
            .close()
            .into_iter()
            .filter_map(|entry| {
                entry.token().cancel();
                entry.status().cancel_if_pending();
                match entry {
                    Entry::OneShot(one_shot) => Some(one_shot.task),
                    Entry::Periodic(_) => None,
                }
            })
            .collect();
        unstarted.extend(self.pool.shutdown_now());
        unstarted
    }

    /// Block until the inner pool terminated and the timer thread exited, or
    /// `timeout` elapses. After a graceful shutdown this includes waiting for
    /// pending delayed tasks to fire and finish.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        if !self.timer.state.lock().is_shut_down() {
            // Nothing requested a shutdown, so this can only time out.
            let _ = self.pool.await_termination(timeout);
            return false;
        }
        if !self.pool.await_termination(timeout) {
            return false;
        }
        if let Some(handle) = self.timer_thread.lock().take() {
            if handle.join().is_err() {
                warn!(pool = %self.timer.name, "Timer thread panicked");
            }
        }
        true
    }

    /// Current lifecycle state of the inner pool.
    #[must_use]
    pub fn state(&self) -> PoolState {
        self.pool.state()
    }

    /// Whether a shutdown has been requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.pool.is_shutdown()
    }

    /// Whether the inner pool has terminated.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.pool.is_terminated()
    }

    /// Number of entries waiting on the timer.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timer.state.lock().queue.len()
    }

    /// Statistics of the inner pool.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Pool name used in thread names and log fields.
    #[must_use]
    pub fn name(&self) -> &str {
        self.pool.name()
    }
}

impl fmt::Debug for ScheduledWorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledWorkerPool")
            .field("pool", &self.pool)
            .field("pending_timers", &self.pending_timers())
            .finish()
    }
}

impl Drop for ScheduledWorkerPool {
    fn drop(&mut self) {
        // Graceful, like `WorkerPool`: accepted delayed tasks still run.
        self.shutdown();
    }
}

impl TimerShared {
    /// Register a watcher that purges cancelled entries promptly.
    fn watch(self: &Arc<Self>, token: &CancellationToken) -> WatchGuard {
        let weak: Weak<Self> = Arc::downgrade(self);
        token.watch(Arc::new(move || {
            if let Some(timer) = weak.upgrade() {
                timer.purge_cancelled();
            }
        }))
    }

    /// Insert an entry unless the timer is closed.
    fn arm(&self, due: Instant, entry: Entry) -> Result<(), PoolError> {
        let mut st = self.state.lock();
        if st.is_shut_down() || !self.pool_accepting() {
            drop(st);
            entry.status().cancel_if_pending();
            return Err(PoolError::Rejected);
        }
        st.queue.push(due, entry);
        self.wakeup.notify_one();
        Ok(())
    }

    fn pool_accepting(&self) -> bool {
        self.pool.is_accepting()
    }

    /// Stop arming new entries and hand back the periodic ones. Pending
    /// one-shots stay and keep the inner pool open until dispatched.
    fn drain(&self) -> Vec<Entry> {
        let mut st = self.state.lock();
        if st.is_shut_down() {
            return Vec::new();
        }
        st.draining = true;
        let mut dropped = st
            .queue
            .drain_where(|entry| matches!(entry, Entry::Periodic(_)));

        if st.queue.is_empty() && !st.dispatching {
            st.closed = true;
        } else if self.pool.hold_open() {
            st.holding = true;
        } else {
            st.closed = true;
            dropped.extend(st.queue.drain_all());
        }
        debug!(
            pool = %self.name,
            pending = st.queue.len(),
            dropped = dropped.len(),
            "Timer draining"
        );
        self.wakeup.notify_all();
        dropped
    }

    /// Close the timer and hand back whatever was pending.
    fn close(&self) -> Vec<Entry> {
        let mut st = self.state.lock();
        if st.closed {
            return Vec::new();
        }
        st.draining = true;
        st.closed = true;
        let pending = st.queue.drain_all();
        self.release(&mut st);
        debug!(pool = %self.name, pending = pending.len(), "Timer closed");
        self.wakeup.notify_all();
        pending
    }

    /// Let the inner pool terminate. Caller holds the timer lock.
    fn release(&self, st: &mut TimerState) {
        if std::mem::take(&mut st.holding) {
            self.pool.release_hold();
        }
    }

    fn purge_cancelled(&self) {
        let removed = {
            let mut st = self.state.lock();
            let removed = st.queue.drain_where(|entry| entry.token().is_cancelled());
            self.wakeup.notify_one();
            removed
        };
        for entry in &removed {
            entry.status().cancel_if_pending();
        }
        if !removed.is_empty() {
            debug!(pool = %self.name, purged = removed.len(), "Cancelled timers purged");
        }
    }

    /// Hand a due entry to the worker pool.
    fn dispatch(self: &Arc<Self>, entry: Entry) {
        if entry.token().is_cancelled() {
            entry.status().cancel_if_pending();
            return;
        }

        match entry {
            Entry::OneShot(OneShot {
                task,
                token,
                status,
                reply,
                ..
            }) => {
                if let Err(e) = self
                    .pool
                    .submit_job(task, token, status.clone(), Some(reply), true)
                {
                    status.cancel_if_pending();
                    debug!(pool = %self.name, error = %e, "Dropping due task");
                }
            }
            Entry::Periodic(periodic) => {
                let timer = Arc::clone(self);
                let firing = Arc::clone(&periodic);
                let task = Task::fire_and_forget(move || firing.fire(&timer));
                if let Err(e) =
                    self.pool
                        .submit_job(task, periodic.token.clone(), StatusCell::new(), None, true)
                {
                    periodic.status.cancel_if_pending();
                    debug!(pool = %self.name, task_id = periodic.id, error = %e, "Dropping periodic task");
                }
            }
        }
    }

    /// Re-arm a periodic task after a firing completed.
    fn rearm(&self, periodic: Arc<Periodic>) {
        if periodic.token.is_cancelled() {
            periodic.status.cancel_if_pending();
            return;
        }
        let Some(due) = periodic.next_due(Instant::now()) else {
            debug!(pool = %self.name, task_id = periodic.id, "Next firing is out of range; schedule ended");
            periodic.status.cancel_if_pending();
            return;
        };
        let mut st = self.state.lock();
        if st.is_shut_down() {
            drop(st);
            periodic.status.cancel_if_pending();
            return;
        }
        periodic.status.set(TaskStatus::Queued);
        st.queue.push(due, Entry::Periodic(periodic));
        self.wakeup.notify_one();
    }
}

impl Periodic {
    /// Runs on a pool worker.
    fn fire(self: &Arc<Self>, timer: &Arc<TimerShared>) {
        self.status.set(TaskStatus::Running);

        let outcome = {
            let mut guard = self.body.lock();
            let body: &mut (dyn FnMut() + Send) = &mut **guard;
            panic::catch_unwind(AssertUnwindSafe(body))
        };
        self.firings.fetch_add(1, Ordering::AcqRel);

        match outcome {
            Ok(()) => timer.rearm(Arc::clone(self)),
            Err(payload) => {
                let cause = panic_message(payload.as_ref());
                warn!(pool = %timer.name, task_id = self.id, cause = %cause, "Periodic task panicked; schedule stopped");
                self.status.set(TaskStatus::Failed);
                if let Some(reply) = self.reply.lock().take() {
                    let _ = reply.send(Err(PoolError::TaskFailure { cause }));
                }
                self.token.cancel();
                // Let the pool report the failure to its listener.
                panic::resume_unwind(payload);
            }
        }
    }

    /// `None` once the next firing would fall outside the clock's range.
    fn next_due(&self, now: Instant) -> Option<Instant> {
        match self.cadence {
            Cadence::FixedDelay { delay } => now.checked_add(delay),
            Cadence::FixedRate { start, period } => {
                let mut tick = self.tick.lock();
                let next = tick.checked_add(1)?;
                let next_at = grid_point(start, period, next)?;
                if next_at >= now {
                    *tick = next;
                    Some(next_at)
                } else {
                    // Overran: fire right away, then resume on the grid
                    // without replaying the missed ticks.
                    let behind = now.saturating_duration_since(start).as_nanos() / period.as_nanos();
                    *tick = u64::try_from(behind).unwrap_or(u64::MAX);
                    Some(now)
                }
            }
        }
    }
}

fn grid_point(start: Instant, period: Duration, tick: u64) -> Option<Instant> {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let nanos = period.as_nanos().checked_mul(u128::from(tick))?;
    let offset = Duration::new(
        u64::try_from(nanos / NANOS_PER_SEC).ok()?,
        u32::try_from(nanos % NANOS_PER_SEC).ok()?,
    );
    start.checked_add(offset)
}

fn instant_after(base: Instant, delay: Duration) -> Result<Instant, PoolError> {
    base.checked_add(delay).ok_or_else(|| {
        PoolError::InvalidConfig(format!("{delay:?} from now is past the clock's range"))
    })
}

fn run_timer(timer: &Arc<TimerShared>) {
    debug!(pool = %timer.name, "Timer thread started");
    loop {
        let due = {
            let mut st = timer.state.lock();
            st.dispatching = false;
            loop {
                if st.draining && !st.closed && st.queue.is_empty() {
                    st.closed = true;
                    timer.release(&mut st);
                }
                if st.closed {
                    debug!(pool = %timer.name, "Timer thread exiting");
                    return;
                }
                let now = Instant::now();
                let mut due = Vec::new();
                while let Some((_, entry)) = st.queue.pop_due(now) {
                    due.push(entry);
                }
                if !due.is_empty() {
                    st.dispatching = true;
                    break due;
                }
                match st.queue.next_due() {
                    Some(at) => {
                        timer.wakeup.wait_until(&mut st, at);
                    }
                    None => timer.wakeup.wait(&mut st),
                }
            }
        };

        for entry in due {
            timer.dispatch(entry);
        }
    }
}

/// Handle to a delayed or periodic task.
///
/// For periodic tasks, [`join`](Self::join) blocks until the schedule ends:
/// it returns `Cancelled` after a cancel or shutdown, or `TaskFailure` if a
/// firing panicked.
pub struct ScheduledHandle<R> {
    inner: TaskHandle<R>,
    firings: Option<Arc<AtomicU64>>,
}

impl<R: Send + 'static> ScheduledHandle<R> {
    /// Scheduler-assigned identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.inner.id()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.inner.status()
    }

    /// Prevent all future firings. A firing already running completes.
    pub fn cancel(&self) -> bool {
        self.inner.cancel()
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Whether this handle belongs to a periodic schedule.
    #[must_use]
    pub const fn is_periodic(&self) -> bool {
        self.firings.is_some()
    }

    /// Completed firings so far (0 or 1 for one-shot tasks).
    #[must_use]
    pub fn firings(&self) -> u64 {
        self.firings.as_ref().map_or_else(
            || u64::from(self.inner.status() == TaskStatus::Completed),
            |f| f.load(Ordering::Acquire),
        )
    }

    /// Block until the task finishes.
    ///
    /// # Errors
    ///
    /// See [`TaskHandle::join`].
    pub fn join(self) -> Result<R, PoolError> {
        self.inner.join()
    }

    /// Block until the task finishes or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// See [`TaskHandle::join_timeout`].
    pub fn join_timeout(&self, timeout: Duration) -> Result<R, PoolError> {
        self.inner.join_timeout(timeout)
    }

    /// Take the result if ready.
    #[must_use]
    pub fn try_join(&self) -> Option<Result<R, PoolError>> {
        self.inner.try_join()
    }
}

impl<R> fmt::Debug for ScheduledHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledHandle")
            .field("inner", &self.inner)
            .field("periodic", &self.firings.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_rate(period_ms: u64) -> (Periodic, Instant) {
        let start = Instant::now();
        let token = CancellationToken::new();
        let watch = token.watch(Arc::new(|| {}));
        let periodic = Periodic {
            id: 0,
            body: Mutex::new(Box::new(|| {})),
            cadence: Cadence::FixedRate {
                start,
                period: Duration::from_millis(period_ms),
            },
            tick: Mutex::new(0),
            firings: Arc::new(AtomicU64::new(0)),
            token,
            status: StatusCell::new(),
            reply: Mutex::new(None),
            _watch: watch,
        };
        (periodic, start)
    }

    #[test]
    fn test_fixed_rate_stays_on_grid() {
        let (periodic, start) = fixed_rate(100);
        let due = periodic.next_due(start + Duration::from_millis(10));
        assert_eq!(due, Some(start + Duration::from_millis(100)));
        let due = periodic.next_due(start + Duration::from_millis(130));
        assert_eq!(due, Some(start + Duration::from_millis(200)));
    }

    #[test]
    fn test_fixed_rate_overrun_fires_once_then_resumes() {
        let (periodic, start) = fixed_rate(100);
        // First firing (tick 0) ran until t=350: ticks 1..=3 are late.
        let now = start + Duration::from_millis(350);
        assert_eq!(periodic.next_due(now), Some(now));
        assert_eq!(*periodic.tick.lock(), 3);

        // The catch-up firing ends at t=360; next is the grid point t=400.
        let now2 = start + Duration::from_millis(360);
        assert_eq!(
            periodic.next_due(now2),
            Some(start + Duration::from_millis(400))
        );
    }

    #[test]
    fn test_grid_point() {
        let start = Instant::now();
        assert_eq!(
            grid_point(start, Duration::from_millis(25), 4),
            Some(start + Duration::from_millis(100))
        );
        assert_eq!(
            grid_point(start, Duration::from_nanos(3), 5_000_000_001),
            Some(start + Duration::new(15, 3))
        );
        assert_eq!(grid_point(start, Duration::MAX, 2), None);
    }

    #[test]
    fn test_out_of_range_next_firing_ends_schedule() {
        let (mut periodic, start) = fixed_rate(100);
        periodic.cadence = Cadence::FixedDelay {
            delay: Duration::MAX,
        };
        assert_eq!(periodic.next_due(start), None);

        let (periodic, start) = fixed_rate(100);
        *periodic.tick.lock() = u64::MAX;
        assert_eq!(periodic.next_due(start), None);
    }

    #[test]
    fn test_instant_after_rejects_overflow() {
        let now = Instant::now();
        assert_eq!(
            instant_after(now, Duration::from_millis(5)),
            Ok(now + Duration::from_millis(5))
        );
        assert!(matches!(
            instant_after(now, Duration::MAX),
            Err(PoolError::InvalidConfig(_))
        ));
    }
}
