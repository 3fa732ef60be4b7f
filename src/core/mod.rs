//! Core execution abstractions: tasks, cancellation, lifecycle and pools.

pub mod cancellation;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod scheduled_pool;
pub mod task;
pub mod timer_queue;
pub mod worker_pool;

pub use cancellation::CancellationToken;
pub use error::{AppResult, PoolError};
pub use events::{FnListener, RecordingListener, TaskCompletion, TaskEvent, TaskFailure, TaskListener};
pub use lifecycle::{Lifecycle, PoolState};
pub use scheduled_pool::{ScheduledHandle, ScheduledWorkerPool};
pub use task::{Task, TaskHandle, TaskId, TaskKind, TaskOutput, TaskStatus};
pub use timer_queue::TimerQueue;
pub use worker_pool::{PoolStats, WorkerPool};
