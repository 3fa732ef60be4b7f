//! Shutdown protocol shared by [`WorkerPool`](super::WorkerPool) and
//! [`ScheduledWorkerPool`](super::ScheduledWorkerPool).
//!
//! ```text
//! Running ──shutdown()──▶ ShuttingDown ──work drained, workers gone──▶ Terminated
//!    │                         │
//!    └──────shutdown_now()─────┴──▶ Stopping ──workers gone──▶ Terminated
//! ```
//!
//! `Terminated` is absorbing.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    /// Accepting and executing tasks.
    Running,
    /// No new tasks; queued tasks are still drained.
    ShuttingDown,
    /// No new tasks; queued tasks discarded; running tasks signalled.
    Stopping,
    /// All workers have exited.
    Terminated,
}

impl PoolState {
    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::ShuttingDown | Self::Stopping)
                | (Self::ShuttingDown, Self::Stopping | Self::Terminated)
                | (Self::Stopping, Self::Terminated)
        )
    }

    /// Whether submissions are accepted in this state.
    #[must_use]
    pub const fn is_accepting(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// State machine guarding pool transitions.
///
/// Lives inside the pool's queue lock; every method takes the facts it needs
/// as arguments so the decision and the mutation happen under one lock.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: PoolState,
}

impl Lifecycle {
    /// A fresh lifecycle in `Running`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: PoolState::Running,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PoolState {
        self.state
    }

    /// `Running → ShuttingDown`. Returns whether a transition happened.
    pub fn shutdown(&mut self) -> bool {
        self.transition(PoolState::ShuttingDown)
    }

    /// `Running | ShuttingDown → Stopping`. Returns whether a transition happened.
    pub fn stop(&mut self) -> bool {
        self.transition(PoolState::Stopping)
    }

    /// Move to `Terminated` once the exit condition of the current state holds.
    ///
    /// `ShuttingDown` terminates once no queued or scheduled work remains
    /// (`drained`) and no worker thread is left; `Stopping` only needs the
    /// workers to be gone.
    pub fn try_terminate(&mut self, drained: bool, live_workers: usize) -> bool {
        let ready = match self.state {
            PoolState::ShuttingDown => drained && live_workers == 0,
            PoolState::Stopping => live_workers == 0,
            PoolState::Running | PoolState::Terminated => false,
        };
        ready && self.transition(PoolState::Terminated)
    }

    fn transition(&mut self, next: PoolState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
