//! # Prometheus Thread Pool
//!
//! In-process task execution and synchronization primitives built on OS
//! threads and `parking_lot`.
//!
//! This library provides worker pools that run submitted closures on a fixed,
//! elastic or single-thread set of workers, a scheduler for delayed and
//! periodic work, a blocking bounded buffer for producer/consumer hand-off,
//! and shared counters with interchangeable synchronization strategies.
//!
//! ## Key Features
//!
//! - **Worker pools**: fixed, cached (grow on demand, retire when idle) and
//!   single-worker sizing behind one `WorkerPool` type
//! - **Orderly and forced shutdown**: `shutdown` drains the queue,
//!   `shutdown_now` discards it and cancels running tasks
//! - **Scheduling**: one-shot delays, fixed-rate and fixed-delay periodic tasks
//!   that never overlap
//! - **Cooperative cancellation**: a `CancellationToken` per task, observed by
//!   blocking primitives so parked workers wake up promptly
//! - **Failure isolation**: a failing or panicking task never takes a worker
//!   down; outcomes go to an injected `TaskListener`
//!
//! ## WorkerPool
//!
//! ```rust
//! use prometheus_thread_pool::config::WorkerPoolConfig;
//! use prometheus_thread_pool::core::WorkerPool;
//! use std::time::Duration;
//!
//! let pool = WorkerPool::new(WorkerPoolConfig::fixed(4))?;
//! let handles: Vec<_> = (0..8_u64)
//!     .map(|i| pool.submit(move || i * i))
//!     .collect::<Result<_, _>>()?;
//! let squares: Vec<u64> = handles
//!     .into_iter()
//!     .map(|h| h.join())
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(squares[7], 49);
//!
//! pool.shutdown();
//! assert!(pool.await_termination(Duration::from_secs(5)));
//! # Ok::<(), prometheus_thread_pool::core::PoolError>(())
//! ```
//!
//! ## Producer/consumer on a pool
//!
//! ```rust
//! use prometheus_thread_pool::buffer::BoundedBuffer;
//! use prometheus_thread_pool::core::WorkerPool;
//!
//! let pool = WorkerPool::fixed(2)?;
//! let buffer = BoundedBuffer::new(4)?;
//!
//! let producer = {
//!     let buffer = buffer.clone();
//!     pool.execute(move || {
//!         for i in 0..100_u32 {
//!             buffer.put(i).expect("consumer is running");
//!         }
//!     })?
//! };
//! let consumer = {
//!     let buffer = buffer.clone();
//!     pool.submit(move || (0..100).map(|_| buffer.get().unwrap_or(0)).sum::<u32>())?
//! };
//!
//! producer.join()?;
//! assert_eq!(consumer.join()?, 4950);
//! # Ok::<(), prometheus_thread_pool::core::PoolError>(())
//! ```
//!
//! For complete examples, see:
//! - `tests/worker_pool_test.rs` - Pool sizing, ordering and shutdown
//! - `tests/scheduled_pool_test.rs` - Delayed and periodic execution

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core execution abstractions: tasks, cancellation, lifecycle and pools.
pub mod core;
/// Configuration models for worker pools.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Blocking bounded producer/consumer buffer.
pub mod buffer;
/// Shared counters with interchangeable synchronization strategies.
pub mod counter;
/// Shared utilities.
pub mod util;
