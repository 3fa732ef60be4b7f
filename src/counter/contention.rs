//! Contention trials: many callers hammering one counter.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::PoolError;
use crate::core::worker_pool::WorkerPool;

use super::{Counter, CounterStrategy};

/// Outcome of one trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentionReport {
    /// Strategy under test.
    pub strategy: CounterStrategy,
    /// Concurrent callers.
    pub callers: usize,
    /// Increments per caller.
    pub per_caller: usize,
    /// `callers * per_caller`.
    pub expected: i64,
    /// Final counter value.
    pub observed: i64,
    /// Wall-clock time from release to the last caller finishing.
    pub elapsed: Duration,
}

impl ContentionReport {
    /// Increments that did not make it into the final value.
    #[must_use]
    pub const fn lost_updates(&self) -> i64 {
        self.expected - self.observed
    }

    /// Whether every increment was observed.
    #[must_use]
    pub const fn is_exact(&self) -> bool {
        self.expected == self.observed
    }
}

fn expected(callers: usize, per_caller: usize) -> i64 {
    i64::try_from(callers.saturating_mul(per_caller)).unwrap_or(i64::MAX)
}

/// Reset `counter`, then let `callers` threads each increment it
/// `per_caller` times.
///
/// Every caller waits on a barrier first so they all start together.
pub fn run_trial<C>(counter: &C, callers: usize, per_caller: usize) -> ContentionReport
where
    C: Counter + ?Sized,
{
    counter.reset();
    let barrier = Barrier::new(callers + 1);

    let elapsed = thread::scope(|scope| {
        for _ in 0..callers {
            scope.spawn(|| {
                barrier.wait();
                for _ in 0..per_caller {
                    counter.increment();
                }
            });
        }
        barrier.wait();
        // Leaving the scope joins every caller.
        Instant::now()
    })
    .elapsed();

    let report = ContentionReport {
        strategy: counter.strategy(),
        callers,
        per_caller,
        expected: expected(callers, per_caller),
        observed: counter.value(),
        elapsed,
    };
    debug!(
        strategy = %report.strategy,
        callers,
        per_caller,
        lost = report.lost_updates(),
        "Contention trial finished"
    );
    report
}

/// Same as [`run_trial`], with the callers running as tasks on `pool`.
///
/// There is no start barrier: a pool with fewer workers than `callers`
/// could never release it.
///
/// # Errors
///
/// Any submission error from the pool, or the first task failure.
pub fn run_trial_on_pool(
    pool: &WorkerPool,
    counter: Arc<dyn Counter>,
    callers: usize,
    per_caller: usize,
) -> Result<ContentionReport, PoolError> {
    counter.reset();
    let started = Instant::now();

    let results = pool.invoke_all((0..callers).map(|_| {
        let counter = Arc::clone(&counter);
        move || {
            for _ in 0..per_caller {
                counter.increment();
            }
        }
    }))?;
    for result in results {
        result?;
    }

    Ok(ContentionReport {
        strategy: counter.strategy(),
        callers,
        per_caller,
        expected: expected(callers, per_caller),
        observed: counter.value(),
        elapsed: started.elapsed(),
    })
}
