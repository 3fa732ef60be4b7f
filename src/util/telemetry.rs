//! Telemetry helpers for structured logging.
//!
//! Pools log through `tracing` with `pool`, `worker_id` and `task_id` fields.
//! Applications can install their own subscriber; these helpers install a
//! default `fmt` subscriber if none is set.

use tracing_subscriber::EnvFilter;

/// Install an env-based subscriber (`RUST_LOG`) unless one is already set.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Install a subscriber filtered by `directive`, e.g.
/// `"prometheus_thread_pool=debug"`, unless one is already set.
///
/// An unparsable directive falls back to `RUST_LOG`.
pub fn init_tracing_with_filter(directive: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::from_default_env());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
