//! Benchmarks for counter strategies and pool throughput.
//!
//! Benchmarks cover:
//! - Uncontended increments per strategy
//! - Contended increments per strategy and caller count
//! - Worker pool submit/join round trips
//! - Bounded buffer hand-off between two threads

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::thread;

use prometheus_thread_pool::buffer::BoundedBuffer;
use prometheus_thread_pool::core::WorkerPool;
use prometheus_thread_pool::counter::{run_trial, CounterStrategy};

// ============================================================================
// Counter Benchmarks
// ============================================================================

fn bench_uncontended_increment(c: &mut Criterion) {
    let mut group = c.benchmark_group("counter_uncontended");
    group.throughput(Throughput::Elements(1));

    for strategy in CounterStrategy::ALL {
        let counter = strategy.build();
        group.bench_function(BenchmarkId::from_parameter(strategy), |b| {
            b.iter(|| counter.increment());
        });
        black_box(counter.value());
    }

    group.finish();
}

fn bench_contended_increment(c: &mut Criterion) {
    const PER_CALLER: usize = 10_000;
    let mut group = c.benchmark_group("counter_contended");
    group.sample_size(20);

    for callers in [2_usize, 4, 8] {
        group.throughput(Throughput::Elements((callers * PER_CALLER) as u64));
        for strategy in CounterStrategy::ALL.into_iter().filter(|s| s.is_synchronized()) {
            let counter = strategy.build();
            group.bench_with_input(
                BenchmarkId::new(strategy.to_string(), callers),
                &callers,
                |b, &callers| {
                    b.iter(|| black_box(run_trial(counter.as_ref(), callers, PER_CALLER)));
                },
            );
        }
    }

    group.finish();
}

// ============================================================================
// Pool and Buffer Benchmarks
// ============================================================================

fn bench_pool_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_round_trip");

    for workers in [1_usize, 4] {
        let pool = WorkerPool::fixed(workers).expect("pool");
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, _| {
            b.iter(|| {
                let handles: Vec<_> = (0..64_u64)
                    .map(|i| pool.submit(move || black_box(i * 2)).expect("submit"))
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().expect("join"))
                    .sum::<u64>()
            });
        });
        pool.shutdown();
    }

    group.finish();
}

fn bench_buffer_hand_off(c: &mut Criterion) {
    const ITEMS: u64 = 1_000;
    let mut group = c.benchmark_group("buffer_hand_off");
    group.throughput(Throughput::Elements(ITEMS));

    for capacity in [1_usize, 16, 256] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                b.iter(|| {
                    let buffer = BoundedBuffer::new(capacity).expect("buffer");
                    let producer = {
                        let buffer = buffer.clone();
                        thread::spawn(move || {
                            for i in 0..ITEMS {
                                buffer.put(i).expect("put");
                            }
                        })
                    };
                    let sum: u64 = (0..ITEMS).map(|_| buffer.get().expect("get")).sum();
                    producer.join().expect("producer");
                    black_box(sum)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_uncontended_increment,
    bench_contended_increment,
    bench_pool_round_trip,
    bench_buffer_hand_off
);
criterion_main!(benches);
