//! Tests for the shutdown state machine

use prometheus_thread_pool::core::{Lifecycle, PoolState};

#[test]
fn test_graceful_path() {
    let mut lifecycle = Lifecycle::new();
    assert_eq!(lifecycle.state(), PoolState::Running);
    assert!(lifecycle.shutdown());
    assert!(!lifecycle.shutdown(), "second shutdown is ignored");
    assert_eq!(lifecycle.state(), PoolState::ShuttingDown);

    assert!(!lifecycle.try_terminate(false, 0), "queue not drained");
    assert!(!lifecycle.try_terminate(true, 1), "worker still live");
    assert!(lifecycle.try_terminate(true, 0));
    assert_eq!(lifecycle.state(), PoolState::Terminated);
}

#[test]
fn test_forced_path_from_shutting_down() {
    let mut lifecycle = Lifecycle::new();
    lifecycle.shutdown();
    assert!(lifecycle.stop());
    assert_eq!(lifecycle.state(), PoolState::Stopping);
    // Stopping ignores the queue.
    assert!(lifecycle.try_terminate(false, 0));
}

#[test]
fn test_terminated_is_absorbing() {
    let mut lifecycle = Lifecycle::new();
    lifecycle.stop();
    lifecycle.try_terminate(true, 0);
    assert!(!lifecycle.shutdown());
    assert!(!lifecycle.stop());
    assert_eq!(lifecycle.state(), PoolState::Terminated);
    assert!(!PoolState::Terminated.is_accepting());
    assert!(PoolState::Running.is_accepting());
}

#[test]
fn test_state_serializes_snake_case() {
    let json = serde_json::to_string(&PoolState::ShuttingDown).unwrap();
    assert_eq!(json, "\"shutting_down\"");
}
