//! Builders to construct worker pools from configuration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{PoolsConfig, WorkerPoolConfig};
use crate::core::error::PoolError;
use crate::core::events::{FnListener, TaskCompletion, TaskFailure, TaskListener};
use crate::core::scheduled_pool::ScheduledWorkerPool;
use crate::core::worker_pool::WorkerPool;

/// Step-by-step construction of a [`WorkerPool`] or [`ScheduledWorkerPool`].
///
/// ```
/// use prometheus_thread_pool::builders::PoolBuilder;
/// use prometheus_thread_pool::config::WorkerPoolConfig;
///
/// let pool = PoolBuilder::new(WorkerPoolConfig::fixed(2))
///     .name("ingest")
///     .on_task_error(|failure| eprintln!("task {} failed: {}", failure.task_id, failure.cause))
///     .build()
///     .unwrap();
/// assert_eq!(pool.name(), "ingest");
/// ```
pub struct PoolBuilder {
    config: WorkerPoolConfig,
    name: Option<String>,
    listeners: Vec<Arc<dyn TaskListener>>,
    callbacks: FnListener,
}

impl PoolBuilder {
    /// Start from `config`.
    #[must_use]
    pub fn new(config: WorkerPoolConfig) -> Self {
        Self {
            config,
            name: None,
            listeners: Vec::new(),
            callbacks: FnListener::new(),
        }
    }

    /// Pool name used in log fields. Defaults to a random `pool-xxxxxxxx`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a listener. Several listeners are called in insertion order.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn TaskListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Callback for failed tasks.
    #[must_use]
    pub fn on_task_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&TaskFailure) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.on_error(f);
        self
    }

    /// Callback for completed tasks.
    #[must_use]
    pub fn on_task_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&TaskCompletion) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.on_complete(f);
        self
    }

    /// Build a plain worker pool.
    ///
    /// # Errors
    ///
    /// See [`WorkerPool::new`].
    pub fn build(self) -> Result<WorkerPool, PoolError> {
        let (config, name, listener) = self.into_parts();
        WorkerPool::build(config, name, listener)
    }

    /// Build a pool with delayed and periodic scheduling.
    ///
    /// # Errors
    ///
    /// See [`ScheduledWorkerPool::new`].
    pub fn build_scheduled(self) -> Result<ScheduledWorkerPool, PoolError> {
        let (config, name, listener) = self.into_parts();
        ScheduledWorkerPool::build(config, name, listener)
    }

    fn into_parts(self) -> (WorkerPoolConfig, Option<String>, Option<Arc<dyn TaskListener>>) {
        let mut listeners = self.listeners;
        if !self.callbacks.is_empty() {
            listeners.push(Arc::new(self.callbacks));
        }
        let listener: Option<Arc<dyn TaskListener>> = match listeners.len() {
            0 => None,
            1 => listeners.pop(),
            _ => Some(Arc::new(Fanout(listeners))),
        };
        (self.config, self.name, listener)
    }
}

impl fmt::Debug for PoolBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("config", &self.config)
            .field("name", &self.name)
            .field("listeners", &self.listeners.len())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

/// Forwards every event to several listeners.
struct Fanout(Vec<Arc<dyn TaskListener>>);

impl TaskListener for Fanout {
    fn on_task_error(&self, failure: &TaskFailure) {
        for listener in &self.0 {
            listener.on_task_error(failure);
        }
    }

    fn on_task_complete(&self, completion: &TaskCompletion) {
        for listener in &self.0 {
            listener.on_task_complete(completion);
        }
    }
}

/// Build one named worker pool per entry of `cfg`, all sharing `listener`.
///
/// # Errors
///
/// `PoolError::InvalidConfig` if any pool configuration is invalid, or the
/// first construction error. Pools built before the failure are dropped,
/// which shuts them down.
pub fn build_pools(
    cfg: &PoolsConfig,
    listener: Option<Arc<dyn TaskListener>>,
) -> Result<HashMap<String, WorkerPool>, PoolError> {
    cfg.validate()
        .map_err(|e| PoolError::InvalidConfig(format!("config invalid: {e}")))?;

    let mut pools = HashMap::new();
    for (name, pool_cfg) in &cfg.pools {
        let mut builder = PoolBuilder::new(pool_cfg.clone()).name(name.clone());
        if let Some(listener) = &listener {
            builder = builder.listener(Arc::clone(listener));
        }
        pools.insert(name.clone(), builder.build()?);
    }

    Ok(pools)
}
