//! Tests for configuration validation

use prometheus_thread_pool::config::{PoolSizing, PoolsConfig, QueuePolicy, WorkerPoolConfig};
use std::collections::HashMap;
use std::time::Duration;

#[test]
fn test_fixed_config_validation() {
    let valid = WorkerPoolConfig::fixed(4);
    assert!(valid.validate().is_ok());
    assert_eq!(valid.sizing(), PoolSizing::Fixed(4));
}

#[test]
fn test_config_invalid_max_workers() {
    let invalid = WorkerPoolConfig::fixed(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_invalid_worker_range() {
    let invalid = WorkerPoolConfig::new().with_worker_range(5, 2);
    let err = invalid.validate().unwrap_err();
    assert!(err.contains("worker_count_min"));
}

#[test]
fn test_config_invalid_idle_timeout_for_elastic() {
    let invalid = WorkerPoolConfig::cached().with_idle_timeout(Duration::ZERO);
    assert!(invalid.validate().is_err());

    // Fixed pools never retire workers, so the timeout does not matter.
    let fixed = WorkerPoolConfig::fixed(2).with_idle_timeout(Duration::ZERO);
    assert!(fixed.validate().is_ok());
}

#[test]
fn test_config_invalid_queue_capacity() {
    let invalid = WorkerPoolConfig::single().with_queue_capacity(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_json_defaults_and_policy() {
    let cfg = WorkerPoolConfig::from_json_str(
        r#"{
            "worker_count_min": 0,
            "worker_count_max": 8,
            "idle_timeout_ms": 500,
            "queue_policy": { "kind": "bounded", "capacity": 64 }
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.sizing(), PoolSizing::Elastic { min: 0, max: 8 });
    assert_eq!(cfg.idle_timeout(), Duration::from_millis(500));
    assert_eq!(cfg.queue_policy, QueuePolicy::Bounded { capacity: 64 });
    assert_eq!(cfg.thread_name_prefix, "pool-worker");

    let roundtrip = serde_json::to_string(&cfg).unwrap();
    assert_eq!(WorkerPoolConfig::from_json_str(&roundtrip).unwrap(), cfg);
}

#[test]
fn test_config_json_rejects_invalid() {
    let err = WorkerPoolConfig::from_json_str(r#"{ "worker_count_max": 0 }"#).unwrap_err();
    assert!(err.contains("worker_count_max"));
    assert!(WorkerPoolConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_from_lookup() {
    let env: HashMap<&str, &str> = [
        ("POOL_WORKER_MIN", "1"),
        ("POOL_WORKER_MAX", " 6 "),
        ("POOL_IDLE_TIMEOUT_MS", "250"),
        ("POOL_QUEUE_CAPACITY", "32"),
        ("POOL_THREAD_NAME_PREFIX", "ingest"),
    ]
    .into_iter()
    .collect();

    let cfg = WorkerPoolConfig::from_lookup(|key| env.get(key).map(ToString::to_string)).unwrap();
    assert_eq!(cfg.sizing(), PoolSizing::Elastic { min: 1, max: 6 });
    assert_eq!(cfg.idle_timeout_ms, 250);
    assert_eq!(cfg.queue_policy, QueuePolicy::Bounded { capacity: 32 });
    assert_eq!(cfg.thread_name_prefix, "ingest");
}

#[test]
fn test_config_from_lookup_reports_bad_numbers() {
    let err = WorkerPoolConfig::from_lookup(|key| {
        (key == "POOL_WORKER_MAX").then(|| "many".to_string())
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("POOL_WORKER_MAX"));
}

#[test]
fn test_pools_config_validation() {
    let mut pools = HashMap::new();
    pools.insert("io".to_string(), WorkerPoolConfig::cached());
    pools.insert("cpu".to_string(), WorkerPoolConfig::fixed(2));
    let cfg = PoolsConfig { pools };
    assert!(cfg.validate().is_ok());

    let empty = PoolsConfig::default();
    assert!(empty.validate().is_err());

    let mut pools = HashMap::new();
    pools.insert("broken".to_string(), WorkerPoolConfig::fixed(0));
    let err = PoolsConfig { pools }.validate().unwrap_err();
    assert!(err.contains("broken"));
}
