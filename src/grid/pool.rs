//! Bounded worker pool for per-target fan-out
//!
//! Tasks own their inputs by value and return through a channel, so
//! workers share no mutable state with the driver or each other. Results
//! come back in submission order with explicit success/failure per task.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// A bounded pool of worker threads.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Build a pool with `workers` threads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the underlying thread pool cannot be
    /// created.
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("dendro-eval-worker-{i}"))
            .panic_handler(|_| tracing::error!("worker task panicked"))
            .build()
            .map_err(|e| Error::Other(format!("failed to build worker pool: {e}")))?;
        Ok(Self { pool })
    }

    /// Run labelled tasks to completion and collect their results in
    /// submission order.
    ///
    /// With a `deadline`, any task not finished within that span of the
    /// fan-out is reported as [`Error::TaskTimeout`] under its label;
    /// already-finished siblings are kept. The straggler thread itself is
    /// abandoned to the pool and its late result discarded.
    pub fn run_tasks<T, F>(
        &self,
        tasks: Vec<(String, F)>,
        deadline: Option<Duration>,
    ) -> Vec<(String, Result<T>)>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let labels: Vec<String> = tasks.iter().map(|(label, _)| label.clone()).collect();
        let (tx, rx) = mpsc::channel();

        for (idx, (_, task)) in tasks.into_iter().enumerate() {
            let tx = tx.clone();
            self.pool.spawn(move || {
                // The receiver may already have given up on this grid point.
                let _ = tx.send((idx, task()));
            });
        }
        drop(tx);

        let started = Instant::now();
        let mut slots: Vec<Option<Result<T>>> = (0..labels.len()).map(|_| None).collect();
        let mut received = 0;

        while received < slots.len() {
            let message = match deadline {
                Some(limit) => {
                    let Some(remaining) = limit.checked_sub(started.elapsed()) else {
                        break;
                    };
                    match rx.recv_timeout(remaining) {
                        Ok(m) => m,
                        Err(_) => break,
                    }
                }
                None => match rx.recv() {
                    Ok(m) => m,
                    Err(_) => break,
                },
            };
            slots[message.0] = Some(message.1);
            received += 1;
        }

        labels
            .into_iter()
            .zip(slots)
            .map(|(label, slot)| match slot {
                Some(result) => (label, result),
                None => {
                    let error = deadline.map_or_else(
                        || Error::Other(format!("worker for {label} terminated without a result")),
                        |timeout| Error::TaskTimeout {
                            target: label.clone(),
                            timeout,
                        },
                    );
                    (label, Err(error))
                }
            })
            .collect()
    }
}
