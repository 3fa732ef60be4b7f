//! Tests for builder modules

use prometheus_thread_pool::builders::{build_pools, PoolBuilder};
use prometheus_thread_pool::config::{PoolsConfig, WorkerPoolConfig};
use prometheus_thread_pool::core::{PoolError, RecordingListener};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_pool_builder_defaults() {
    let pool = PoolBuilder::new(WorkerPoolConfig::fixed(2))
        .build()
        .unwrap();
    assert!(pool.name().starts_with("pool-"));
    assert_eq!(pool.config().worker_count_max, 2);
}

#[test]
fn test_pool_builder_callbacks() {
    let errors = Arc::new(AtomicUsize::new(0));
    let completions = Arc::new(AtomicUsize::new(0));
    let pool = {
        let errors = Arc::clone(&errors);
        let completions = Arc::clone(&completions);
        PoolBuilder::new(WorkerPoolConfig::single())
            .name("callbacks")
            .on_task_error(move |_| {
                errors.fetch_add(1, Ordering::SeqCst);
            })
            .on_task_complete(move |completion| {
                assert_eq!(completion.pool, "callbacks");
                completions.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap()
    };

    pool.submit(|| 1).unwrap().join().unwrap();
    let _ = pool.execute(|| panic!("boom")).unwrap().join();

    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

#[test]
fn test_pool_builder_scheduled() {
    let listener = Arc::new(RecordingListener::new(8));
    let pool = PoolBuilder::new(WorkerPoolConfig::fixed(1))
        .name("timers")
        .listener(listener.clone())
        .build_scheduled()
        .unwrap();
    assert_eq!(pool.name(), "timers");

    let handle = pool.schedule(|| 3, Duration::from_millis(5)).unwrap();
    assert_eq!(handle.join().unwrap(), 3);
    assert_eq!(listener.completed_count(), 1);
}

#[test]
fn test_build_pools_rejects_invalid_config() {
    let mut pools = HashMap::new();
    pools.insert("bad".to_string(), WorkerPoolConfig::fixed(0));
    let err = build_pools(&PoolsConfig { pools }, None).unwrap_err();
    assert!(matches!(err, PoolError::InvalidConfig(_)));
}

#[test]
fn test_build_pools_shares_listener() {
    let listener = Arc::new(RecordingListener::new(8));
    let mut pools = HashMap::new();
    pools.insert("a".to_string(), WorkerPoolConfig::single());
    pools.insert("b".to_string(), WorkerPoolConfig::single());

    let built = build_pools(&PoolsConfig { pools }, Some(listener.clone())).unwrap();
    for pool in built.values() {
        pool.submit(|| ()).unwrap().join().unwrap();
    }
    let mut seen: Vec<String> = listener
        .events()
        .into_iter()
        .map(|event| match event {
            prometheus_thread_pool::core::TaskEvent::Completed(c) => c.pool,
            prometheus_thread_pool::core::TaskEvent::Failed(f) => f.pool,
        })
        .collect();
    seen.sort();
    assert_eq!(seen, vec!["a", "b"]);
}
