//! Error types for pool, scheduler and buffer operations.

use thiserror::Error;

/// Errors produced by pools, task handles and blocking primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The pool is no longer accepting tasks (shut down or stopping).
    #[error("task rejected: pool is not running")]
    Rejected,
    /// A bounded task queue is at capacity.
    #[error("task queue is full")]
    QueueFull,
    /// A blocking call or a task was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,
    /// The task body returned an error or panicked.
    #[error("task failed: {cause}")]
    TaskFailure {
        /// Rendered error or panic message.
        cause: String,
    },
    /// A timed wait elapsed without success.
    #[error("operation timed out")]
    Timeout,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A worker or timer thread could not be spawned.
    #[error("failed to spawn thread: {0}")]
    Spawn(String),
}

impl PoolError {
    /// Build a `TaskFailure` from any displayable cause.
    pub fn task_failure(cause: impl std::fmt::Display) -> Self {
        Self::TaskFailure {
            cause: cause.to_string(),
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
