//! Task outcome reporting.
//!
//! Pools never print. Instead they report failures (and optionally
//! completions) to an injected [`TaskListener`]. [`FnListener`] adapts plain
//! closures; [`RecordingListener`] keeps a bounded in-memory log for tests and
//! diagnostics.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;

use super::task::TaskId;

/// A task body returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Failed task.
    pub task_id: TaskId,
    /// Name of the pool that ran it.
    pub pool: String,
    /// Worker that ran it.
    pub worker_id: usize,
    /// Rendered error or panic message.
    pub cause: String,
}

/// A task body finished successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompletion {
    /// Completed task.
    pub task_id: TaskId,
    /// Name of the pool that ran it.
    pub pool: String,
    /// Worker that ran it.
    pub worker_id: usize,
    /// Wall-clock execution time.
    pub elapsed: Duration,
}

/// Either kind of outcome, as stored by [`RecordingListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// See [`TaskCompletion`].
    Completed(TaskCompletion),
    /// See [`TaskFailure`].
    Failed(TaskFailure),
}

impl TaskEvent {
    /// Task the event refers to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        match self {
            Self::Completed(c) => c.task_id,
            Self::Failed(f) => f.task_id,
        }
    }
}

/// Receives task outcomes from worker threads.
///
/// Called on the worker thread right after the task finishes; keep it cheap.
/// A panicking listener is contained and logged.
pub trait TaskListener: Send + Sync {
    /// A task failed.
    fn on_task_error(&self, failure: &TaskFailure);

    /// A task completed. Ignored unless overridden.
    fn on_task_complete(&self, _completion: &TaskCompletion) {}
}

type ErrorFn = Box<dyn Fn(&TaskFailure) + Send + Sync>;
type CompleteFn = Box<dyn Fn(&TaskCompletion) + Send + Sync>;

/// Listener built from closures.
#[derive(Default)]
pub struct FnListener {
    on_error: Option<ErrorFn>,
    on_complete: Option<CompleteFn>,
}

impl FnListener {
    /// A listener that ignores everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure callback.
    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&TaskFailure) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Set the completion callback.
    #[must_use]
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&TaskCompletion) + Send + Sync + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Whether neither callback is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.on_error.is_none() && self.on_complete.is_none()
    }
}

impl TaskListener for FnListener {
    fn on_task_error(&self, failure: &TaskFailure) {
        if let Some(f) = &self.on_error {
            f(failure);
        }
    }

    fn on_task_complete(&self, completion: &TaskCompletion) {
        if let Some(f) = &self.on_complete {
            f(completion);
        }
    }
}

impl fmt::Debug for FnListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener")
            .field("on_error", &self.on_error.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Bounded in-memory event log; oldest events are evicted first.
#[derive(Debug)]
pub struct RecordingListener {
    events: Mutex<VecDeque<TaskEvent>>,
    max_events: usize,
}

impl RecordingListener {
    /// Create a listener retaining at most `max_events` events.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            max_events,
        }
    }

    /// Snapshot of stored events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Stored failures, oldest first.
    #[must_use]
    pub fn failures(&self) -> Vec<TaskFailure> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                TaskEvent::Failed(f) => Some(f.clone()),
                TaskEvent::Completed(_) => None,
            })
            .collect()
    }

    /// Number of stored completions.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, TaskEvent::Completed(_)))
            .count()
    }

    fn record(&self, event: TaskEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

impl TaskListener for RecordingListener {
    fn on_task_error(&self, failure: &TaskFailure) {
        self.record(TaskEvent::Failed(failure.clone()));
    }

    fn on_task_complete(&self, completion: &TaskCompletion) {
        self.record(TaskEvent::Completed(completion.clone()));
    }
}
