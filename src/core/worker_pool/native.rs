//! Native implementation of `WorkerPool` using OS threads.
//!
//! # Design Principles
//!
//! - **One queue lock**: the FIFO queue, lifecycle state, worker accounting
//!   and the running-task registry live under a single `parking_lot::Mutex`,
//!   so claiming a task and observing a forced stop cannot interleave
//! - **No polling**: idle workers park on a Condvar; terminations are signalled
//!   through a second Condvar
//! - **Failure isolation**: task panics are caught at the task boundary and a
//!   panicking listener is contained as well

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{QueuePolicy, WorkerPoolConfig};
use crate::core::cancellation::{self, CancellationToken};
use crate::core::error::PoolError;
use crate::core::events::{TaskCompletion, TaskFailure, TaskListener};
use crate::core::lifecycle::{Lifecycle, PoolState};
use crate::core::task::{
    panic_message, result_slot, Outcome, StatusCell, Task, TaskHandle, TaskId, TaskStatus,
};

use super::{Job, PoolCounters, PoolStats};

/// Everything guarded by the queue lock.
struct QueueState {
    lifecycle: Lifecycle,
    queue: VecDeque<Job>,
    live_workers: usize,
    idle_workers: usize,
    /// Tokens of tasks currently executing, signalled by `shutdown_now`.
    running: HashMap<TaskId, CancellationToken>,
    /// Schedulers still owed a graceful drain. While non-zero, a shutting
    /// down pool keeps its workers and accepts their jobs.
    feeders: usize,
}

/// State shared by the pool handle, its workers and any scheduler feeding it.
pub(crate) struct Shared {
    name: String,
    config: WorkerPoolConfig,
    state: Mutex<QueueState>,
    work_available: Condvar,
    terminated: Condvar,
    counters: PoolCounters,
    listener: Option<Arc<dyn TaskListener>>,
    next_task_id: AtomicU64,
    next_worker_id: AtomicUsize,
}

/// Worker pool with dedicated OS threads.
///
/// # Design
///
/// - **Fixed**: `worker_count_min == worker_count_max`, all workers spawned
///   up front
/// - **Elastic**: workers beyond the minimum are spawned when every idle
///   worker already has a task to claim, and retire after `idle_timeout`
/// - **Single**: one worker, so tasks run in submission order
///
/// Dropping the pool starts a graceful shutdown but does not wait for it.
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Create a pool from `config`.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Spawn` if a core worker thread cannot be started
    pub fn new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        Self::build(config, None, None)
    }

    /// Create a pool reporting task outcomes to `listener`.
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

    /// A pool with exactly `workers` threads.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn fixed(workers: usize) -> Result<Self, PoolError> {
        Self::new(WorkerPoolConfig::fixed(workers))
    }

    /// A pool growing on demand and retiring idle workers.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn cached() -> Result<Self, PoolError> {
        Self::new(WorkerPoolConfig::cached())
    }

    /// A pool with a single worker executing tasks in submission order.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn single() -> Result<Self, PoolError> {
        Self::new(WorkerPoolConfig::single())
    }

    pub(crate) fn build(
        config: WorkerPoolConfig,
        name: Option<String>,
        listener: Option<Arc<dyn TaskListener>>,
    ) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let name = name.unwrap_or_else(|| {
            let id = Uuid::new_v4().simple().to_string();
            format!("pool-{}", &id[..8])
        });
        let core_workers = config.worker_count_min;

        let shared = Arc::new(Shared {
            name,
            config,
            state: Mutex::new(QueueState {
                lifecycle: Lifecycle::new(),
                queue: VecDeque::new(),
                live_workers: 0,
                idle_workers: 0,
                running: HashMap::new(),
                feeders: 0,
            }),
            work_available: Condvar::new(),
            terminated: Condvar::new(),
            counters: PoolCounters::default(),
            listener,
            next_task_id: AtomicU64::new(0),
            next_worker_id: AtomicUsize::new(0),
        });

        {
            let mut st = shared.state.lock();
            for _ in 0..core_workers {
                if let Err(e) = shared.spawn_worker(&mut st) {
                    st.lifecycle.stop();
                    shared.try_terminate(&mut st);
                    shared.work_available.notify_all();
                    return Err(e);
                }
            }
        }

        info!(
            pool = %shared.name,
            worker_count_min = shared.config.worker_count_min,
            worker_count_max = shared.config.worker_count_max,
            sizing = ?shared.config.sizing(),
            queue_policy = ?shared.config.queue_policy,
            "WorkerPool initialized"
        );

        Ok(Self { shared })
    }

    /// Submit a closure run for its side effects.
    ///
    /// # Errors
    ///
    /// - `PoolError::Rejected` if the pool is not running
    /// - `PoolError::QueueFull` if a bounded queue is at capacity
    pub fn execute<F>(&self, f: F) -> Result<TaskHandle<()>, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit_task(Task::fire_and_forget(f))
    }

    /// Submit a closure whose value is delivered through the handle.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    pub fn submit<R, F>(&self, f: F) -> Result<TaskHandle<R>, PoolError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        self.submit_task(Task::computed(f))
    }

    /// Submit a closure that can fail; an `Err` surfaces as
    /// `PoolError::TaskFailure` on the handle and is reported to the listener.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    pub fn submit_fallible<R, E, F>(&self, f: F) -> Result<TaskHandle<R>, PoolError>
    where
        R: Send + 'static,
        E: fmt::Display,
        F: FnOnce() -> Result<R, E> + Send + 'static,
    {
        self.submit_task(Task::fallible(f))
    }

    /// Submit a pre-built [`Task`]. `R` must match the task's output type
    /// (`()` for fire-and-forget tasks).
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    pub fn submit_task<R: Send + 'static>(&self, task: Task) -> Result<TaskHandle<R>, PoolError> {
        let token = CancellationToken::new();
        let status = StatusCell::new();
        let (tx, rx) = result_slot();
        let id = self
            .shared
            .submit_job(task, token.clone(), status.clone(), Some(tx), false)?;
        Ok(TaskHandle::new(id, token, status, rx))
    }

    /// Submit every closure and wait for all of them, in submission order.
    ///
    /// If a submission is refused, the batch submitted so far is cancelled.
    ///
    /// # Errors
    ///
    /// Returns the submission error; per-task failures are reported in the
    /// returned vector instead.
    pub fn invoke_all<R, F, I>(&self, tasks: I) -> Result<Vec<Result<R, PoolError>>, PoolError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
        I: IntoIterator<Item = F>,
    {
        let mut handles = Vec::new();
        for f in tasks {
            match self.submit(f) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    for handle in &handles {
                        handle.cancel();
                    }
                    return Err(e);
                }
            }
        }
        Ok(handles.into_iter().map(TaskHandle::join).collect())
    }

    /// Stop accepting tasks; queued tasks still run. Idempotent.
    pub fn shutdown(&self) {
        let mut st = self.shared.state.lock();
        if !st.lifecycle.shutdown() {
            return;
        }
        info!(
            pool = %self.shared.name,
            queued = st.queue.len(),
            running = st.running.len(),
            "Shutting down worker pool"
        );
        self.shared.try_terminate(&mut st);
        self.shared.work_available.notify_all();
    }

    /// Stop accepting tasks, discard the queue and signal running tasks.
    ///
    /// Returns the tasks that never started; their handles resolve to
    /// `PoolError::Cancelled`. Calling it again returns an empty list.
    ///
    /// A task counts as started once a worker has dequeued it. A worker that
    /// dequeued a task just before this call may still enter its body after
    /// this returns, but with its token already cancelled, so
    /// [`cancellation::is_cancelled`](crate::core::cancellation::is_cancelled)
    /// is `true` from its first instruction. No task still queued at the time
    /// of the call ever runs.
    pub fn shutdown_now(&self) -> Vec<Task> {
        let (drained, running) = {
            let mut st = self.shared.state.lock();
            if !st.lifecycle.stop() {
                return Vec::new();
            }
            let drained: Vec<Job> = st.queue.drain(..).collect();
            let running: Vec<CancellationToken> = st.running.values().cloned().collect();
            warn!(
                pool = %self.shared.name,
                discarded = drained.len(),
                running = running.len(),
                "Forcing worker pool shutdown"
            );
            self.shared.try_terminate(&mut st);
            self.shared.work_available.notify_all();
            (drained, running)
        };

        // Outside the queue lock: watchers take buffer locks.
        for token in &running {
            token.cancel();
        }
        PoolCounters::add(&self.shared.counters.cancelled, drained.len());
        drained
            .into_iter()
            .map(|job| {
                job.token.cancel();
                job.discard()
            })
            .collect()
    }

    /// Block until the pool is terminated or `timeout` elapses.
    ///
    /// Returns whether termination was observed. Must not be called from one
    /// of this pool's own workers.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut st = self.shared.state.lock();
        while st.lifecycle.state() != PoolState::Terminated {
            match deadline {
                Some(deadline) => {
                    if self
                        .shared
                        .terminated
                        .wait_until(&mut st, deadline)
                        .timed_out()
                    {
                        return st.lifecycle.state() == PoolState::Terminated;
                    }
                }
                None => self.shared.terminated.wait(&mut st),
            }
        }
        true
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PoolState {
        self.shared.state.lock().lifecycle.state()
    }

    /// Whether `shutdown` or `shutdown_now` has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.state() != PoolState::Running
    }

    /// Whether every worker has exited after a shutdown.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state() == PoolState::Terminated
    }

    /// Pool name used in thread names and log fields.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Configuration the pool was built with.
    #[must_use]
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.shared.config
    }

    /// Snapshot of pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let mut stats = {
            let st = self.shared.state.lock();
            PoolStats {
                name: self.shared.name.clone(),
                state: Some(st.lifecycle.state()),
                worker_count: st.live_workers,
                idle_workers: st.idle_workers,
                queued_tasks: st.queue.len(),
                active_tasks: st.running.len(),
                ..PoolStats::default()
            }
        };
        self.shared.counters.fill(&mut stats);
        stats
    }

    pub(crate) const fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("WorkerPool")
            .field("name", &stats.name)
            .field("state", &stats.state)
            .field("sizing", &self.shared.config.sizing())
            .field("workers", &stats.worker_count)
            .field("queued_tasks", &stats.queued_tasks)
            .field("active_tasks", &stats.active_tasks)
            .finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Signal shutdown but don't join: workers drain the queue on their own.
        let mut st = self.shared.state.lock();
        if st.lifecycle.shutdown() {
            debug!(pool = %self.shared.name, "WorkerPool dropped without explicit shutdown");
            self.shared.try_terminate(&mut st);
            self.shared.work_available.notify_all();
        }
    }
}

impl Shared {
    /// Whether submissions are currently accepted.
    pub(crate) fn is_accepting(&self) -> bool {
        self.state.lock().lifecycle.state().is_accepting()
    }

    /// Register a scheduler that will keep feeding jobs after `shutdown`.
    ///
    /// Returns `false` if the pool is already past `ShuttingDown`.
    pub(crate) fn hold_open(&self) -> bool {
        let mut st = self.state.lock();
        if matches!(
            st.lifecycle.state(),
            PoolState::Stopping | PoolState::Terminated
        ) {
            return false;
        }
        st.feeders += 1;
        true
    }

    /// Drop a hold taken with [`hold_open`](Self::hold_open).
    pub(crate) fn release_hold(&self) {
        let mut st = self.state.lock();
        st.feeders = st.feeders.saturating_sub(1);
        debug!(pool = %self.name, feeders = st.feeders, "Scheduler hold released");
        self.try_terminate(&mut st);
        self.work_available.notify_all();
    }

    /// Enqueue a job, growing the pool if needed.
    pub(crate) fn submit_job(
        self: &Arc<Self>,
        task: Task,
        token: CancellationToken,
        status: StatusCell,
        reply: Option<Sender<Outcome>>,
        from_scheduler: bool,
    ) -> Result<TaskId, PoolError> {
        let mut st = self.state.lock();

        let state = st.lifecycle.state();
        let held_open = state == PoolState::ShuttingDown && st.feeders > 0;
        if !state.is_accepting() && !(from_scheduler && held_open) {
            PoolCounters::bump(&self.counters.rejected);
            debug!(pool = %self.name, state = ?st.lifecycle.state(), "Task rejected");
            return Err(PoolError::Rejected);
        }
        if let QueuePolicy::Bounded { capacity } = self.config.queue_policy {
            if st.queue.len() >= capacity {
                PoolCounters::bump(&self.counters.rejected);
                warn!(pool = %self.name, capacity, "Worker pool queue is full");
                return Err(PoolError::QueueFull);
            }
        }

        let id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        st.queue.push_back(Job {
            id,
            task,
            token,
            status,
            reply,
            enqueued_at: Instant::now(),
        });

        // Every idle worker will claim one queued job; grow only past that.
        if st.queue.len() > st.idle_workers && st.live_workers < self.config.worker_count_max {
            if let Err(e) = self.spawn_worker(&mut st) {
                if st.live_workers == 0 {
                    let _ = st.queue.pop_back();
                    return Err(e);
                }
                // Existing workers will get to it.
            }
        }

        PoolCounters::bump(&self.counters.submitted);
        debug!(pool = %self.name, task_id = id, queued = st.queue.len(), "Task submitted");
        self.work_available.notify_one();
        Ok(id)
    }

    /// Spawn one worker thread. Caller holds the queue lock.
    fn spawn_worker(self: &Arc<Self>, st: &mut QueueState) -> Result<(), PoolError> {
        let worker_id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let mut builder =
            thread::Builder::new().name(format!("{}-{worker_id}", self.config.thread_name_prefix));
        if let Some(size) = self.config.thread_stack_size {
            builder = builder.stack_size(size);
        }

        let shared = Arc::clone(self);
        st.live_workers += 1;
        match builder.spawn(move || worker_loop(&shared, worker_id)) {
            Ok(_) => {
                debug!(pool = %self.name, worker_id, live = st.live_workers, "Worker spawned");
                Ok(())
            }
            Err(e) => {
                st.live_workers -= 1;
                error!(pool = %self.name, worker_id, error = %e, "Failed to spawn worker thread");
                Err(PoolError::Spawn(e.to_string()))
            }
        }
    }

    /// Block until a job is claimed, or return `None` when this worker must exit.
    ///
    /// On `None` the worker's slot has already been released.
    fn next_job(&self, worker_id: usize) -> Option<Job> {
        let mut st = self.state.lock();
        loop {
            let state = st.lifecycle.state();
            if matches!(state, PoolState::Stopping | PoolState::Terminated) {
                break;
            }

            if let Some(job) = st.queue.pop_front() {
                job.status.set(TaskStatus::Running);
                st.running.insert(job.id, job.token.clone());
                return Some(job);
            }

            if state == PoolState::ShuttingDown && st.feeders == 0 {
                break;
            }

            let surplus = st.live_workers > self.config.worker_count_min;
            st.idle_workers += 1;
            let timed_out = if surplus {
                self.work_available
                    .wait_for(&mut st, self.config.idle_timeout())
                    .timed_out()
            } else {
                self.work_available.wait(&mut st);
                false
            };
            st.idle_workers -= 1;

            if timed_out
                && st.queue.is_empty()
                && st.lifecycle.state() != PoolState::Stopping
                && st.live_workers > self.config.worker_count_min
            {
                debug!(pool = %self.name, worker_id, "Idle worker retiring");
                break;
            }
        }

        st.live_workers -= 1;
        self.try_terminate(&mut st);
        None
    }

    fn run_job(&self, job: Job, worker_id: usize) {
        let Job {
            id,
            task,
            token,
            status,
            reply,
            enqueued_at,
        } = job;

        if token.is_cancelled() {
            status.cancel_if_pending();
            PoolCounters::bump(&self.counters.cancelled);
            debug!(pool = %self.name, worker_id, task_id = id, "Skipping cancelled task");
            drop(reply);
            drop(task);
            self.state.lock().running.remove(&id);
            return;
        }

        debug!(
            pool = %self.name,
            worker_id,
            task_id = id,
            kind = ?task.kind(),
            queued_ms = enqueued_at.elapsed().as_millis(),
            "Worker executing task"
        );

        let started = Instant::now();
        let result = {
            let _scope = cancellation::enter(token);
            task.run()
        };
        let elapsed = started.elapsed();

        // Listener first, so a joined handle implies the outcome was reported.
        match result {
            Ok(value) => {
                PoolCounters::bump(&self.counters.completed);
                debug!(pool = %self.name, worker_id, task_id = id, ?elapsed, "Worker completed task");
                let completion = TaskCompletion {
                    task_id: id,
                    pool: self.name.clone(),
                    worker_id,
                    elapsed,
                };
                self.notify(|listener| listener.on_task_complete(&completion));
                Job::finish(reply, &status, Ok(value));
            }
            Err(cause) => {
                PoolCounters::bump(&self.counters.failed);
                warn!(pool = %self.name, worker_id, task_id = id, cause = %cause, "Task failed");
                let failure = TaskFailure {
                    task_id: id,
                    pool: self.name.clone(),
                    worker_id,
                    cause: cause.clone(),
                };
                self.notify(|listener| listener.on_task_error(&failure));
                Job::finish(reply, &status, Err(PoolError::TaskFailure { cause }));
            }
        }

        self.state.lock().running.remove(&id);
    }

    fn notify<F>(&self, f: F)
    where
        F: FnOnce(&dyn TaskListener),
    {
        let Some(listener) = self.listener.as_deref() else {
            return;
        };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(listener))) {
            error!(
                pool = %self.name,
                panic = %panic_message(payload.as_ref()),
                "Task listener panicked"
            );
        }
    }

    /// Move to `Terminated` if the exit condition holds. Caller holds the lock.
    fn try_terminate(&self, st: &mut QueueState) {
        let drained = st.queue.is_empty() && st.feeders == 0;
        if st.lifecycle.try_terminate(drained, st.live_workers) {
            info!(pool = %self.name, "Worker pool terminated");
            self.terminated.notify_all();
        }
    }
}

/// Releases the worker slot if the run loop unwinds unexpectedly.
struct WorkerExit<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut st = self.shared.state.lock();
            st.live_workers = st.live_workers.saturating_sub(1);
            self.shared.try_terminate(&mut st);
        }
    }
}

fn worker_loop(shared: &Arc<Shared>, worker_id: usize) {
    let mut exit = WorkerExit {
        shared,
        armed: true,
    };
    debug!(pool = %shared.name, worker_id, "Worker thread started");

    while let Some(job) = shared.next_job(worker_id) {
        shared.run_job(job, worker_id);
    }

    exit.armed = false;
    debug!(pool = %shared.name, worker_id, "Worker thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_worker_pool_basic() {
        let pool = WorkerPool::fixed(2).unwrap();
        let handle = pool.submit(|| "Result: hello".to_string()).unwrap();
        assert_eq!(handle.join().unwrap(), "Result: hello");

        let stats = pool.stats();
        assert_eq!(stats.worker_count, 2);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.submitted_tasks, 1);
    }

    #[test]
    fn test_worker_pool_multiple_tasks() {
        let pool = WorkerPool::fixed(4).unwrap();
        let count = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let count = Arc::clone(&count);
                pool.submit(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                    format!("task-{i}")
                })
                .unwrap()
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), format!("task-{i}"));
        }
        assert_eq!(count.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_debug_reports_sizing() {
        let single = format!("{:?}", WorkerPool::single().unwrap());
        assert!(single.contains("sizing: Single"), "{single}");
        let fixed = format!("{:?}", WorkerPool::fixed(3).unwrap());
        assert!(fixed.contains("sizing: Fixed(3)"), "{fixed}");
        let cached = format!("{:?}", WorkerPool::cached().unwrap());
        assert!(cached.contains("sizing: Elastic"), "{cached}");
    }

    #[test]
    fn test_scheduler_hold_defers_termination() {
        let pool = WorkerPool::fixed(1).unwrap();
        let shared = Arc::clone(pool.shared());
        assert!(shared.hold_open());
        pool.shutdown();

        // Public submissions are refused, the holder's are still accepted.
        assert_eq!(pool.submit(|| 1).unwrap_err(), PoolError::Rejected);
        let (tx, rx) = result_slot();
        shared
            .submit_job(
                Task::computed(|| 2),
                CancellationToken::new(),
                StatusCell::new(),
                Some(tx),
                true,
            )
            .unwrap();
        assert_eq!(*rx.recv().unwrap().unwrap().downcast::<i32>().unwrap(), 2);
        assert!(!pool.await_termination(Duration::from_millis(50)));

        shared.release_hold();
        assert!(pool.await_termination(Duration::from_secs(5)));
        assert!(!shared.hold_open(), "no holds after termination");
    }

    #[test]
    fn test_cached_pool_spawns_on_demand() {
        let pool = WorkerPool::cached().unwrap();
        assert_eq!(pool.stats().worker_count, 0);

        pool.execute(|| thread::sleep(Duration::from_millis(20)))
            .unwrap();
        assert!(pool.stats().worker_count >= 1);

        pool.shutdown();
        assert!(pool.await_termination(Duration::from_secs(5)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = WorkerPool::new(WorkerPoolConfig::fixed(0)).unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfig(_)));
    }

    #[test]
    fn test_drop_starts_graceful_shutdown() {
        let done = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::single().unwrap();
            for _ in 0..3 {
                let done = Arc::clone(&done);
                pool.execute(move || {
                    thread::sleep(Duration::from_millis(5));
                    done.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
            }
        }
        let deadline = Instant::now() + Duration::from_secs(5);
        while done.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }
}
