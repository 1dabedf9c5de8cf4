//! Bounded worker pool that runs an operation over a batch of releases.
//!
//! One producer task feeds releases into a queue, a fixed number of worker
//! tasks drain it, and the calling task gathers one outcome per release. The
//! run only returns after every task has been joined, so nothing from one
//! batch is still running when the next one starts.

use crate::error::{OperationError, ReleaseError};
use crate::operation::ReleaseOperation;
use crate::release::ReleaseSpec;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, debug_span, warn};

/// Resolves the number of workers for a batch of `items` releases.
///
/// A `requested` value of 0 or above `items` is clamped to `items`.
/// Exclusive access overrides everything and yields a single worker.
pub fn resolve_concurrency(requested: usize, items: usize, exclusive: bool) -> usize {
    if exclusive {
        return 1;
    }
    if requested == 0 || requested > items {
        items
    } else {
        requested
    }
}

/// The result of running the operation for one release.
#[derive(Debug)]
pub struct Outcome {
    pub release: ReleaseSpec,
    pub result: Result<(), OperationError>,
}

/// Summary of one pool run.
#[derive(Debug, Default)]
pub struct PoolReport {
    /// Number of workers that were started.
    pub concurrency: usize,
    /// Number of outcomes gathered, successes included.
    pub received: usize,
    /// Failures in completion order.
    pub errors: Vec<ReleaseError>,
}

impl PoolReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs a [`ReleaseOperation`] over batches of releases with bounded
/// parallelism.
pub struct ScatterGather<O: ?Sized> {
    operation: Arc<O>,
    concurrency: usize,
}

impl<O> ScatterGather<O>
where
    O: ReleaseOperation + ?Sized + 'static,
{
    /// Creates a pool that asks for `concurrency` workers per batch, with
    /// `0` meaning one worker per release.
    pub fn new(operation: Arc<O>, concurrency: usize) -> Self {
        Self {
            operation,
            concurrency,
        }
    }

    /// Runs the operation over `releases` and returns the failures.
    ///
    /// An empty list means every release succeeded.
    pub async fn run(&self, releases: &[ReleaseSpec], exclusive: bool) -> Vec<ReleaseError> {
        self.run_with_report(releases, exclusive).await.errors
    }

    /// Runs the operation over `releases`, attempting every one of them
    /// even when some fail.
    pub async fn run_with_report(&self, releases: &[ReleaseSpec], exclusive: bool) -> PoolReport {
        let total = releases.len();
        let concurrency = resolve_concurrency(self.concurrency, total, exclusive);

        if exclusive {
            debug!(
                requested = self.concurrency,
                "exclusive access requested, processing releases one at a time"
            );
        }

        let (release_tx, release_rx) = mpsc::channel::<ReleaseSpec>(1);
        let release_rx = Arc::new(Mutex::new(release_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<Outcome>(concurrency.max(1));

        let mut tasks = JoinSet::new();

        let inputs = releases.to_vec();
        tasks.spawn(
            async move {
                for release in inputs {
                    if release_tx.send(release).await.is_err() {
                        break;
                    }
                }
            }
            .in_current_span(),
        );

        for worker_id in 1..=concurrency {
            let queue = Arc::clone(&release_rx);
            let results = result_tx.clone();
            let operation = Arc::clone(&self.operation);

            tasks.spawn(
                async move {
                    debug!("worker {}/{} started", worker_id, concurrency);
                    worker_loop(queue, results, operation, worker_id).await;
                    debug!("worker {}/{} finished", worker_id, concurrency);
                }
                .instrument(debug_span!("release_worker", worker_id)),
            );
        }
        drop(result_tx);

        let mut report = PoolReport {
            concurrency,
            ..Default::default()
        };

        for i in 0..total {
            debug!("receiving result {}", i);
            let Some(outcome) = result_rx.recv().await else {
                break;
            };
            report.received += 1;

            match outcome.result {
                Ok(()) => {
                    debug!("received result for release \"{}\"", outcome.release.name);
                }
                Err(source) => {
                    report.errors.push(ReleaseError {
                        id: outcome.release.id(),
                        release: outcome.release.name,
                        source,
                    });
                }
            }
            debug!("received result for {}", i);
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "pool task ended abnormally");
            }
        }

        if report.received != total {
            warn!(
                expected = total,
                received = report.received,
                "pool run ended with missing results"
            );
        }

        report
    }
}

async fn worker_loop<O>(
    queue: Arc<Mutex<mpsc::Receiver<ReleaseSpec>>>,
    results: mpsc::Sender<Outcome>,
    operation: Arc<O>,
    worker_id: usize,
) where
    O: ReleaseOperation + ?Sized,
{
    loop {
        let next = queue.lock().await.recv().await;
        let Some(release) = next else {
            break;
        };

        let result = AssertUnwindSafe(operation.run(&release, worker_id))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(OperationError::Panicked(panic_message(&*panic))));

        debug!("sending result for release: {}", release.name);
        let name = release.name.clone();
        if results.send(Outcome { release, result }).await.is_err() {
            break;
        }
        debug!("sent result for release: {}", name);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
