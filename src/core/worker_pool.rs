//! Worker pool with dedicated OS threads pulling from a shared FIFO queue.
//!
//! This module provides a `WorkerPool` that executes submitted tasks on a
//! fixed, elastic or single-thread set of workers, with orderly
//! (`shutdown`) and forced (`shutdown_now`) termination.
//!
//! # Key Features
//!
//! - **Three sizing policies**: fixed, cached/elastic with idle retirement, single
//! - **Handles**: every submission returns a [`TaskHandle`](super::TaskHandle)
//! - **Failure isolation**: panics and errors stay inside the task boundary and
//!   are reported to the injected [`TaskListener`](super::TaskListener)
//! - **Cooperative cancellation**: forced shutdown cancels the token of every
//!   running task and hands back the unstarted ones
//!
//! # Example
//!
//! ```
//! use prometheus_thread_pool::config::WorkerPoolConfig;
//! use prometheus_thread_pool::core::WorkerPool;
//! use std::time::Duration;
//!
//! let pool = WorkerPool::new(WorkerPoolConfig::fixed(2)).unwrap();
//! let handle = pool.submit(|| 6 * 7).unwrap();
//! assert_eq!(handle.join().unwrap(), 42);
//!
//! pool.shutdown();
//! assert!(pool.await_termination(Duration::from_secs(5)));
//! ```

mod native;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use super::cancellation::CancellationToken;
use super::lifecycle::PoolState;
use super::task::{Outcome, StatusCell, Task, TaskId, TaskStatus};

pub use native::WorkerPool;
pub(crate) use native::Shared as PoolShared;

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Pool name.
    pub name: String,
    /// Lifecycle state at snapshot time.
    pub state: Option<PoolState>,
    /// Live worker threads.
    pub worker_count: usize,
    /// Workers waiting for work.
    pub idle_workers: usize,
    /// Tasks waiting in the queue.
    pub queued_tasks: usize,
    /// Currently executing tasks.
    pub active_tasks: usize,
    /// Total tasks accepted.
    pub submitted_tasks: u64,
    /// Total tasks completed successfully.
    pub completed_tasks: u64,
    /// Total tasks that failed or panicked.
    pub failed_tasks: u64,
    /// Total tasks discarded before running.
    pub cancelled_tasks: u64,
    /// Total submissions refused.
    pub rejected_tasks: u64,
}

/// Monotonic counters shared by the pool and its workers.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub cancelled: AtomicU64,
    pub rejected: AtomicU64,
}

impl PoolCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Fill the counter fields of `stats`.
    pub fn fill(&self, stats: &mut PoolStats) {
        stats.submitted_tasks = self.submitted.load(Ordering::Relaxed);
        stats.completed_tasks = self.completed.load(Ordering::Relaxed);
        stats.failed_tasks = self.failed.load(Ordering::Relaxed);
        stats.cancelled_tasks = self.cancelled.load(Ordering::Relaxed);
        stats.rejected_tasks = self.rejected.load(Ordering::Relaxed);
    }
}

/// A queued task together with its bookkeeping.
pub(crate) struct Job {
    pub id: TaskId,
    pub task: Task,
    pub token: CancellationToken,
    pub status: StatusCell,
    /// Result slot; `None` for internal jobs nobody awaits.
    pub reply: Option<Sender<Outcome>>,
    pub enqueued_at: Instant,
}

impl Job {
    /// Drop the job without running it; its handle resolves to `Cancelled`.
    pub fn discard(self) -> Task {
        self.status.cancel_if_pending();
        self.task
    }

    /// Record the outcome and deliver it to the handle, if still listening.
    pub fn finish(reply: Option<Sender<Outcome>>, status: &StatusCell, outcome: Outcome) {
        status.set(if outcome.is_ok() {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        });
        if let Some(reply) = reply {
            // The handle may have been dropped; nobody is waiting then.
            let _ = reply.send(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_stats_default() {
        let stats = PoolStats::default();
        assert_eq!(stats.worker_count, 0);
        assert_eq!(stats.active_tasks, 0);
        assert_eq!(stats.completed_tasks, 0);
        assert!(stats.state.is_none());
    }

    #[test]
    fn test_pool_counters_fill() {
        let counters = PoolCounters::default();
        PoolCounters::add(&counters.submitted, 10);
        PoolCounters::bump(&counters.completed);
        PoolCounters::bump(&counters.rejected);

        let mut stats = PoolStats::default();
        counters.fill(&mut stats);
        assert_eq!(stats.submitted_tasks, 10);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.rejected_tasks, 1);
        assert_eq!(stats.failed_tasks, 0);
    }

    #[test]
    fn test_job_discard_resolves_handle() {
        let (tx, rx) = super::super::task::result_slot();
        let status = StatusCell::new();
        let job = Job {
            id: 1,
            task: Task::computed(|| 1_u8),
            token: CancellationToken::new(),
            status: status.clone(),
            reply: Some(tx),
            enqueued_at: Instant::now(),
        };
        let task = job.discard();
        assert_eq!(status.get(), TaskStatus::Cancelled);
        assert!(rx.recv().is_err(), "reply slot dropped with the job");
        assert!(task.run().is_ok(), "returned task is still runnable");
    }
}
