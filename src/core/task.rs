//! Units of work and the handles used to await them.
//!
//! A [`Task`] is what a worker executes. It is either fire-and-forget or
//! computed; the worker dispatches on the variant and always catches panics at
//! the task boundary. A [`TaskHandle`] is the caller's side of a submission:
//! it can wait for the result, poll it, or request cancellation.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use serde::{Deserialize, Serialize};

use super::cancellation::CancellationToken;
use super::error::PoolError;

/// Identifier assigned to each submission, unique within one pool.
pub type TaskId = u64;

/// Type-erased value produced by a task.
pub type TaskOutput = Box<dyn Any + Send>;

/// What a worker hands back to the submitter.
pub(crate) type Outcome = Result<TaskOutput, PoolError>;

type FireAndForgetFn = Box<dyn FnOnce() + Send + 'static>;
type ComputedFn = Box<dyn FnOnce() -> Result<TaskOutput, String> + Send + 'static>;

/// A unit of work accepted by a pool.
pub enum Task {
    /// Runs for its side effects only.
    FireAndForget(FireAndForgetFn),
    /// Produces a value or an error.
    Computed(ComputedFn),
}

impl Task {
    /// Wrap a closure run purely for its side effects.
    pub fn fire_and_forget<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::FireAndForget(Box::new(f))
    }

    /// Wrap a closure whose value is delivered to the submitter.
    pub fn computed<R, F>(f: F) -> Self
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        Self::Computed(Box::new(move || Ok(Box::new(f()) as TaskOutput)))
    }

    /// Wrap a closure that can fail; the error is rendered with `Display`.
    pub fn fallible<R, E, F>(f: F) -> Self
    where
        R: Send + 'static,
        E: fmt::Display,
        F: FnOnce() -> Result<R, E> + Send + 'static,
    {
        Self::Computed(Box::new(move || {
            f().map(|value| Box::new(value) as TaskOutput)
                .map_err(|e| e.to_string())
        }))
    }

    /// Which variant this task is.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        match self {
            Self::FireAndForget(_) => TaskKind::FireAndForget,
            Self::Computed(_) => TaskKind::Computed,
        }
    }

    /// Execute the task on the calling thread.
    ///
    /// Panics are caught and reported as an error carrying the panic message.
    /// Fire-and-forget tasks yield `()` on success.
    ///
    /// # Errors
    ///
    /// Returns the rendered error if the body failed or panicked.
    pub fn run(self) -> Result<TaskOutput, String> {
        let result = match self {
            Self::FireAndForget(f) => {
                panic::catch_unwind(AssertUnwindSafe(f)).map(|()| Ok(Box::new(()) as TaskOutput))
            }
            Self::Computed(f) => panic::catch_unwind(AssertUnwindSafe(f)),
        };
        match result {
            Ok(outcome) => outcome,
            Err(payload) => Err(panic_message(payload.as_ref())),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Task").field(&self.kind()).finish()
    }
}

/// Discriminant of [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// No value is produced.
    FireAndForget,
    /// A value or error is produced.
    Computed,
}

/// Render a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "task panicked".to_string()
    }
}

/// Status of a task in the pool lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in a queue (or on a timer).
    Queued,
    /// Picked up by a worker.
    Running,
    /// Finished successfully.
    Completed,
    /// Returned an error or panicked.
    Failed,
    /// Cancelled or discarded before it could finish.
    Cancelled,
}

impl TaskStatus {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Running => 1,
            Self::Completed => 2,
            Self::Failed => 3,
            Self::Cancelled => 4,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Queued,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Failed,
            _ => Self::Cancelled,
        }
    }

    /// Whether the task will make no further progress.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Shared, lock-free status slot.
#[derive(Debug, Clone)]
pub(crate) struct StatusCell(Arc<AtomicU8>);

impl StatusCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(TaskStatus::Queued.to_u8())))
    }

    pub(crate) fn get(&self) -> TaskStatus {
        TaskStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, status: TaskStatus) {
        self.0.store(status.to_u8(), Ordering::Release);
    }

    /// Move to `Cancelled` unless a terminal status was already recorded.
    pub(crate) fn cancel_if_pending(&self) {
        let _ = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
            (!TaskStatus::from_u8(raw).is_terminal()).then_some(TaskStatus::Cancelled.to_u8())
        });
    }
}

/// The submitter's end of a one-shot result slot.
pub(crate) fn result_slot() -> (Sender<Outcome>, Receiver<Outcome>) {
    crossbeam_channel::bounded(1)
}

/// Caller-held reference to a submitted task.
///
/// The result is delivered once. If the task is discarded (cancelled before it
/// started, or drained by a forced shutdown) every retrieval method reports
/// [`PoolError::Cancelled`].
pub struct TaskHandle<R> {
    id: TaskId,
    token: CancellationToken,
    status: StatusCell,
    rx: Receiver<Outcome>,
    _result: PhantomData<fn() -> R>,
}

impl<R: Send + 'static> TaskHandle<R> {
    pub(crate) const fn new(
        id: TaskId,
        token: CancellationToken,
        status: StatusCell,
        rx: Receiver<Outcome>,
    ) -> Self {
        Self {
            id,
            token,
            status,
            rx,
            _result: PhantomData,
        }
    }

    /// Identifier assigned at submission.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Current lifecycle status of the task.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status.get()
    }

    /// Whether the task has completed, failed or been cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status.get().is_terminal()
    }

    /// Request cancellation.
    ///
    /// A task that has not started yet is skipped by its worker. A running
    /// task only stops if it polls [`cancellation::is_cancelled`](super::cancellation::is_cancelled)
    /// or is parked in a cancellable blocking call.
    pub fn cancel(&self) -> bool {
        self.token.cancel()
    }

    /// Whether cancellation has been requested for this task.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The cancellation token handed to the task.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Block until the task finishes.
    ///
    /// # Errors
    ///
    /// - `PoolError::TaskFailure` if the task returned an error or panicked
    /// - `PoolError::Cancelled` if the task was discarded
    pub fn join(self) -> Result<R, PoolError> {
        match self.rx.recv() {
            Ok(outcome) => Self::unpack(outcome),
            Err(_) => Err(PoolError::Cancelled),
        }
    }

    /// Block until the task finishes or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// - `PoolError::Timeout` if the result is not available in time
    /// - `PoolError::TaskFailure` if the task returned an error or panicked
    /// - `PoolError::Cancelled` if the task was discarded or the result was
    ///   already taken
    pub fn join_timeout(&self, timeout: Duration) -> Result<R, PoolError> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Self::unpack(outcome),
            Err(RecvTimeoutError::Timeout) => Err(PoolError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(PoolError::Cancelled),
        }
    }

    /// Take the result if it is ready, without blocking.
    #[must_use]
    pub fn try_join(&self) -> Option<Result<R, PoolError>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(Self::unpack(outcome)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PoolError::Cancelled)),
        }
    }

    /// Await the result from an async context.
    ///
    /// The blocking wait is moved onto tokio's blocking thread pool so the
    /// calling runtime is never stalled.
    ///
    /// # Errors
    ///
    /// Same as [`join`](Self::join); a failed blocking-pool join is reported
    /// as `PoolError::TaskFailure`.
    #[cfg(feature = "tokio-runtime")]
    pub async fn join_async(self) -> Result<R, PoolError> {
        tokio::task::spawn_blocking(move || self.join())
            .await
            .map_err(PoolError::task_failure)?
    }

    fn unpack(outcome: Outcome) -> Result<R, PoolError> {
        outcome.and_then(|value| {
            value
                .downcast::<R>()
                .map(|boxed| *boxed)
                .map_err(|_| PoolError::task_failure("unexpected task result type"))
        })
    }
}

impl<R> fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("status", &self.status.get())
            .finish_non_exhaustive()
    }
}
