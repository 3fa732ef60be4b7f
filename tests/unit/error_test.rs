//! Tests for error types

use prometheus_thread_pool::buffer::PutError;
use prometheus_thread_pool::core::PoolError;

#[test]
fn test_rejected_error() {
    assert_eq!(
        format!("{}", PoolError::Rejected),
        "task rejected: pool is not running"
    );
}

#[test]
fn test_queue_full_error() {
    assert_eq!(format!("{}", PoolError::QueueFull), "task queue is full");
}

#[test]
fn test_cancelled_error() {
    assert_eq!(format!("{}", PoolError::Cancelled), "operation cancelled");
}

#[test]
fn test_task_failure_error() {
    let err = PoolError::TaskFailure {
        cause: "division by zero".to_string(),
    };
    assert_eq!(format!("{}", err), "task failed: division by zero");
    assert_eq!(err, PoolError::task_failure("division by zero"));
}

#[test]
fn test_invalid_config_error() {
    let err = PoolError::InvalidConfig("worker_count_max must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: worker_count_max must be greater than 0"
    );
}

#[test]
fn test_spawn_error() {
    let err = PoolError::Spawn("resource temporarily unavailable".to_string());
    assert_eq!(
        format!("{}", err),
        "failed to spawn thread: resource temporarily unavailable"
    );
}

#[test]
fn test_put_error_keeps_item_and_source() {
    let err = PutError {
        item: vec![1, 2, 3],
        reason: PoolError::Timeout,
    };
    assert_eq!(format!("{}", err), "put failed: operation timed out");
    let source = std::error::Error::source(&err).map(ToString::to_string);
    assert_eq!(source.as_deref(), Some("operation timed out"));
    assert_eq!(err.into_inner(), vec![1, 2, 3]);
}

#[test]
fn test_pool_error_converts_to_anyhow() {
    fn load() -> prometheus_thread_pool::core::AppResult<()> {
        Err(PoolError::Rejected.into())
    }
    let err = load().unwrap_err();
    assert!(err.downcast_ref::<PoolError>().is_some());
}
