//! Tests for utility functions

use prometheus_thread_pool::core::{cancellation, CancellationToken, WorkerPool};
use prometheus_thread_pool::util::{init_tracing, init_tracing_with_filter};

#[test]
fn test_init_tracing_twice() {
    init_tracing_with_filter("prometheus_thread_pool=trace");
    init_tracing();
}

#[test]
fn test_current_token_outside_pool() {
    assert!(cancellation::current().is_none());
    assert!(!cancellation::is_cancelled());
}

#[test]
fn test_current_token_inside_pool_matches_handle() {
    let pool = WorkerPool::single().unwrap();
    let handle = pool
        .submit(|| cancellation::current().expect("token installed on worker"))
        .unwrap();
    let expected: CancellationToken = handle.token().clone();
    let seen = handle.join().unwrap();
    assert!(seen.same_as(&expected));
}
