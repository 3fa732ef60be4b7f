//! Worker pool configuration structures.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Upper bound on workers for the cached preset.
pub const DEFAULT_CACHED_MAX_WORKERS: usize = 256;

/// Idle time after which a surplus worker retires.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 60_000;

/// Default prefix for worker thread names.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "pool-worker";

/// How the pool's task queue reacts to growth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum QueuePolicy {
    /// Queue grows without limit.
    #[default]
    Unbounded,
    /// Submissions beyond `capacity` queued tasks fail with `QueueFull`.
    Bounded {
        /// Maximum number of queued (not yet running) tasks.
        capacity: usize,
    },
}

/// Sizing behaviour derived from the worker bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolSizing {
    /// Exactly one worker; strict FIFO execution.
    Single,
    /// A constant number of workers.
    Fixed(usize),
    /// Between `min` and `max` workers, grown on demand and retired when idle.
    Elastic {
        /// Workers kept alive while idle.
        min: usize,
        /// Ceiling on concurrently live workers.
        max: usize,
    },
}

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Workers kept alive for the pool's lifetime.
    pub worker_count_min: usize,
    /// Ceiling on live workers.
    pub worker_count_max: usize,
    /// Idle time in milliseconds before a worker above the minimum retires.
    pub idle_timeout_ms: u64,
    /// Queue growth policy.
    pub queue_policy: QueuePolicy,
    /// Prefix for worker thread names.
    pub thread_name_prefix: String,
    /// Stack size for worker threads in bytes, platform default if unset.
    pub thread_stack_size: Option<usize>,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::fixed(num_cpus::get())
    }
}

impl WorkerPoolConfig {
    /// Default configuration: a fixed pool with one worker per CPU.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exactly `workers` workers for the pool's lifetime.
    #[must_use]
    pub fn fixed(workers: usize) -> Self {
        Self {
            worker_count_min: workers,
            worker_count_max: workers,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            queue_policy: QueuePolicy::Unbounded,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            thread_stack_size: None,
        }
    }

    /// Workers created on demand and retired after one minute idle.
    #[must_use]
    pub fn cached() -> Self {
        Self {
            worker_count_min: 0,
            worker_count_max: DEFAULT_CACHED_MAX_WORKERS,
            ..Self::fixed(0)
        }
    }

    /// One worker; tasks run strictly in submission order.
    #[must_use]
    pub fn single() -> Self {
        Self::fixed(1)
    }

    /// Set both bounds to `workers`.
    #[must_use]
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count_min = workers;
        self.worker_count_max = workers;
        self
    }

    /// Set the worker bounds.
    #[must_use]
    pub fn with_worker_range(mut self, min: usize, max: usize) -> Self {
        self.worker_count_min = min;
        self.worker_count_max = max;
        self
    }

    /// Set the idle timeout for surplus workers.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the queue policy.
    #[must_use]
    pub fn with_queue_policy(mut self, policy: QueuePolicy) -> Self {
        self.queue_policy = policy;
        self
    }

    /// Bound the queue to `capacity` tasks.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_policy = QueuePolicy::Bounded { capacity };
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = Some(bytes);
        self
    }

    /// Idle timeout as a `Duration`.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Sizing behaviour implied by the bounds.
    #[must_use]
    pub const fn sizing(&self) -> PoolSizing {
        match (self.worker_count_min, self.worker_count_max) {
            (1, 1) => PoolSizing::Single,
            (min, max) if min == max => PoolSizing::Fixed(max),
            (min, max) => PoolSizing::Elastic { min, max },
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count_max == 0 {
            return Err("worker_count_max must be greater than 0".into());
        }
        if self.worker_count_min > self.worker_count_max {
            return Err(format!(
                "worker_count_min ({}) must not exceed worker_count_max ({})",
                self.worker_count_min, self.worker_count_max
            ));
        }
        if self.worker_count_min < self.worker_count_max && self.idle_timeout_ms == 0 {
            return Err("idle_timeout_ms must be greater than 0 for elastic pools".into());
        }
        if let QueuePolicy::Bounded { capacity: 0 } = self.queue_policy {
            return Err("bounded queue capacity must be greater than 0".into());
        }
        if self.thread_name_prefix.as_bytes().contains(&0) {
            return Err("thread_name_prefix must not contain null bytes".into());
        }
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string and validate it.
    ///
    /// Missing fields fall back to [`WorkerPoolConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build a configuration from the process environment.
    ///
    /// A `.env` file is loaded first if present. Recognised variables:
    /// `POOL_WORKER_MIN`, `POOL_WORKER_MAX`, `POOL_IDLE_TIMEOUT_MS`,
    /// `POOL_QUEUE_CAPACITY` and `POOL_THREAD_NAME_PREFIX`. Unset variables
    /// keep their default.
    ///
    /// # Errors
    ///
    /// Fails if a variable is not a valid number or the result is invalid.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Fails if a value is not a valid number or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: Option<String>) -> AppResult<Option<T>>
        where
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            raw.map(|value| {
                value
                    .trim()
                    .parse::<T>()
                    .with_context(|| format!("{key}={value:?} is not a valid number"))
            })
            .transpose()
        }

        let mut cfg = Self::default();
        if let Some(min) = parse::<usize>("POOL_WORKER_MIN", lookup("POOL_WORKER_MIN"))? {
            cfg.worker_count_min = min;
        }
        if let Some(max) = parse::<usize>("POOL_WORKER_MAX", lookup("POOL_WORKER_MAX"))? {
            cfg.worker_count_max = max;
        }
        if let Some(ms) = parse::<u64>("POOL_IDLE_TIMEOUT_MS", lookup("POOL_IDLE_TIMEOUT_MS"))? {
            cfg.idle_timeout_ms = ms;
        }
        if let Some(capacity) =
            parse::<usize>("POOL_QUEUE_CAPACITY", lookup("POOL_QUEUE_CAPACITY"))?
        {
            cfg.queue_policy = QueuePolicy::Bounded { capacity };
        }
        if let Some(prefix) = lookup("POOL_THREAD_NAME_PREFIX") {
            cfg.thread_name_prefix = prefix;
        }

        cfg.validate()
            .map_err(anyhow::Error::msg)
            .context("pool configuration from environment is invalid")?;
        Ok(cfg)
    }
}

/// Named pool configurations for applications running several pools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolsConfig {
    /// Map of pool name to configuration.
    pub pools: HashMap<String, WorkerPoolConfig>,
}

impl PoolsConfig {
    /// Validate all pools and ensure at least one pool exists.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid pool.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("at least one pool must be defined".into());
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| format!("pool `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_sizing() {
        assert_eq!(WorkerPoolConfig::single().sizing(), PoolSizing::Single);
        assert_eq!(WorkerPoolConfig::fixed(4).sizing(), PoolSizing::Fixed(4));
        assert_eq!(
            WorkerPoolConfig::cached().sizing(),
            PoolSizing::Elastic {
                min: 0,
                max: DEFAULT_CACHED_MAX_WORKERS
            }
        );
    }

    #[test]
    fn test_idle_timeout_round_trip() {
        let cfg = WorkerPoolConfig::cached().with_idle_timeout(Duration::from_millis(250));
        assert_eq!(cfg.idle_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_from_lookup() {
        let cfg = WorkerPoolConfig::from_lookup(|key| match key {
            "POOL_WORKER_MIN" => Some("1".into()),
            "POOL_WORKER_MAX" => Some(" 8 ".into()),
            "POOL_QUEUE_CAPACITY" => Some("32".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.sizing(), PoolSizing::Elastic { min: 1, max: 8 });
        assert_eq!(cfg.queue_policy, QueuePolicy::Bounded { capacity: 32 });
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = WorkerPoolConfig::from_lookup(|key| {
            (key == "POOL_WORKER_MAX").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("POOL_WORKER_MAX"));

        let err = WorkerPoolConfig::from_lookup(|key| match key {
            "POOL_WORKER_MIN" => Some("4".into()),
            "POOL_WORKER_MAX" => Some("2".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("must not exceed"));
    }
}
