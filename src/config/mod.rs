//! Configuration models for worker pools.

pub mod pool;

pub use pool::{
    PoolSizing, PoolsConfig, QueuePolicy, WorkerPoolConfig, DEFAULT_CACHED_MAX_WORKERS,
    DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_THREAD_NAME_PREFIX,
};
