//! Execution engine - runs operations with bounded parallelism
//!
//! Every operation runs exactly once. A failing operation never stops the
//! others, and the call blocks until all of them have finished.

use crate::context::ProgressCallback;
use crate::error::{Error, Result};
use crate::outcome::{AggregatedResult, OperationOutcome};
use crate::plan::Operation;
use rayon::prelude::*;

/// Run `ops` with at most `parallelism` in flight
///
/// A ceiling below 1 is treated as 1. Outcomes come back in the order the
/// operations were given. The only error is failing to build the worker
/// pool, which happens before anything runs.
pub fn execute(
    ops: Vec<Operation>,
    parallelism: usize,
    progress: &dyn ProgressCallback,
) -> Result<AggregatedResult> {
    let jobs = parallelism.max(1);

    if ops.is_empty() {
        return Ok(AggregatedResult::default());
    }

    progress.on_batch_start(ops.len());
    let outcomes: Vec<OperationOutcome> = if jobs == 1 || ops.len() == 1 {
        // Sequential execution
        ops.into_iter().map(|op| run_one(op, progress)).collect()
    } else {
        execute_parallel(ops, jobs, progress)?
    };
    progress.on_batch_complete();

    Ok(AggregatedResult::new(outcomes))
}

/// Execute operations in parallel using a dedicated rayon pool
fn execute_parallel(
    ops: Vec<Operation>,
    jobs: usize,
    progress: &dyn ProgressCallback,
) -> Result<Vec<OperationOutcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("membership-{i}"))
        .build()
        .map_err(|e| Error::Pool(e.to_string()))?;

    log::debug!("Running {} operations on {jobs} workers", ops.len());
    Ok(pool.install(|| {
        // One operation per task so an idle worker can always steal the next
        ops.into_par_iter()
            .with_max_len(1)
            .map(|op| run_one(op, progress))
            .collect()
    }))
}

/// Run a single operation and report it
fn run_one(op: Operation, progress: &dyn ProgressCallback) -> OperationOutcome {
    let kind = op.kind;
    let member_id = op.member_id.clone();
    progress.on_operation_start(kind, &member_id);

    let outcome = match op.run() {
        Ok(()) => OperationOutcome::success(kind, member_id),
        Err(e) => OperationOutcome::failure(kind, member_id, e),
    };
    progress.on_operation_complete(&outcome);
    outcome
}

/// Simple execution without progress reporting
pub fn execute_simple(ops: Vec<Operation>, parallelism: usize) -> Result<AggregatedResult> {
    use crate::context::NoProgress;

    execute(ops, parallelism, &NoProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::OperationKind;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    /// Operations that sleep and track how many run at once
    fn sleepy_ops(
        n: usize,
        delay: Duration,
        in_flight: &Arc<AtomicUsize>,
        max: &Arc<AtomicUsize>,
    ) -> Vec<Operation> {
        (0..n)
            .map(|i| {
                let in_flight = Arc::clone(in_flight);
                let max = Arc::clone(max);
                Operation::new(
                    OperationKind::CreateGroup,
                    format!("g{i}"),
                    Box::new(move || {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(delay);
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }),
                )
            })
            .collect()
    }

    #[test]
    fn test_execute_empty() {
        let result = execute_simple(Vec::new(), 4).unwrap();
        assert!(result.is_empty());
        assert!(result.into_result("ctx").is_ok());
    }

    #[test]
    fn test_parallelism_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max = Arc::new(AtomicUsize::new(0));
        let ops = sleepy_ops(5, Duration::from_millis(100), &in_flight, &max);

        let start = Instant::now();
        let result = execute_simple(ops, 2).unwrap();
        let elapsed = start.elapsed();

        assert_eq!(result.len(), 5);
        assert!(result.is_success());
        assert_eq!(max.load(Ordering::SeqCst), 2);
        assert!(elapsed >= Duration::from_millis(300), "took {elapsed:?}");
        assert!(elapsed < Duration::from_millis(480), "took {elapsed:?}");
    }

    #[test]
    fn test_uneven_split_keeps_every_slot_busy() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max = Arc::new(AtomicUsize::new(0));
        let ops = sleepy_ops(10, Duration::from_millis(100), &in_flight, &max);

        let start = Instant::now();
        let result = execute_simple(ops, 3).unwrap();
        let elapsed = start.elapsed();

        assert_eq!(result.len(), 10);
        assert_eq!(max.load(Ordering::SeqCst), 3);
        // ceil(10 / 3) rounds of 100ms
        assert!(elapsed >= Duration::from_millis(400), "took {elapsed:?}");
        assert!(elapsed < Duration::from_millis(490), "took {elapsed:?}");
    }

    #[test]
    fn test_zero_parallelism_runs_sequentially() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max = Arc::new(AtomicUsize::new(0));
        let ops = sleepy_ops(3, Duration::from_millis(5), &in_flight, &max);

        let result = execute_simple(ops, 0).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(max.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failures_do_not_short_circuit_and_order_is_kept() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ops: Vec<Operation> = (0..6)
            .map(|i| {
                let ran = Arc::clone(&ran);
                Operation::new(
                    OperationKind::DeleteUser,
                    format!("u{i}"),
                    Box::new(move || {
                        ran.fetch_add(1, Ordering::SeqCst);
                        if i % 2 == 0 {
                            Err(Error::http("HTTP 500", Some(500)))
                        } else {
                            Ok(())
                        }
                    }),
                )
            })
            .collect();

        let result = execute_simple(ops, 3).unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 6);

        let ids: Vec<&str> = result
            .outcomes()
            .iter()
            .map(|o| o.member_id.as_str())
            .collect();
        assert_eq!(ids, vec!["u0", "u1", "u2", "u3", "u4", "u5"]);
        assert_eq!(result.summary().failed, 3);
        assert!(result.into_result("ctx").is_err());
    }

    #[test]
    fn test_progress_sees_every_operation() {
        struct Counting {
            started: AtomicUsize,
            completed: AtomicUsize,
            batch: AtomicUsize,
        }

        impl ProgressCallback for Counting {
            fn on_batch_start(&self, count: usize) {
                self.batch.store(count, Ordering::SeqCst);
            }
            fn on_operation_start(&self, _kind: OperationKind, _member_id: &str) {
                self.started.fetch_add(1, Ordering::SeqCst);
            }
            fn on_operation_complete(&self, _outcome: &OperationOutcome) {
                self.completed.fetch_add(1, Ordering::SeqCst);
            }
            fn on_batch_complete(&self) {}
        }

        let progress = Counting {
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            batch: AtomicUsize::new(0),
        };
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max = Arc::new(AtomicUsize::new(0));
        let ops = sleepy_ops(4, Duration::from_millis(1), &in_flight, &max);

        execute(ops, 4, &progress).unwrap();
        assert_eq!(progress.batch.load(Ordering::SeqCst), 4);
        assert_eq!(progress.started.load(Ordering::SeqCst), 4);
        assert_eq!(progress.completed.load(Ordering::SeqCst), 4);
    }
}
