//! Concurrent "process every item" runs.
//!
//! A run lists every item id, splits the ids into at most `worker_count` contiguous partitions
//! ([`partition`]), and submits one task per partition to the shared [`WorkerPool`]. Each task
//! walks its partition in order: load the item, set its status to `PROCESSED`, persist it, and
//! append the outcome to the run's shared result container. The [`ProcessingHandle`] returned by
//! [`ItemProcessor::process_all`] resolves only after every partition task has been joined.
//!
//! Per-record problems never fail the run. A missing item is reported as skipped; a load or
//! persist failure, cancellation or timeout is reported as failed for that record alone. Only a
//! failure to list the ids or to submit work to the pool fails the handle itself.
//!
//! # Example
//! ```ignore
//! let processor = ItemProcessor::new(store, pool, ProcessorConfig::default());
//! let handle = processor.process_all();
//! let report = handle.await?;
//! println!("{} processed, {} skipped", report.processed.len(), report.skipped.len());
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::db::errors::DbError;
use crate::db::handlers::ItemStore;
use crate::db::models::items::status;
use crate::types::{ItemId, RunId, WorkerId};

mod partition;
mod pool;
mod report;


pub use partition::partition;
pub use pool::{PoolError, WorkerPool};
pub use report::{FailedItem, FailureReason, ProcessedItem, ProcessingReport, RecordOutcome};

/// Tuning for individual records within a run. The worker count belongs to the [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Delay before each record is loaded. Cancellable, and off by default.
    pub record_delay: Option<Duration>,

    /// How many times a failed persist is retried before the record is reported as failed
    pub persist_retries: u32,

    /// Base backoff between persist retries (doubled on each attempt)
    pub retry_backoff: Duration,

    /// Upper bound for the backoff between persist retries
    pub max_retry_backoff: Duration,

    /// Deadline for a whole partition task. Records not finished in time are reported as timed out.
    pub task_timeout: Option<Duration>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            record_delay: None,
            persist_retries: 0,
            retry_backoff: Duration::from_millis(50),
            max_retry_backoff: Duration::from_secs(2),
            task_timeout: None,
        }
    }
}

impl ProcessorConfig {
    /// Backoff before persist retry number `attempt` (zero-based): `retry_backoff * 2^attempt`,
    /// capped at `max_retry_backoff`.
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.retry_backoff.saturating_mul(factor).min(self.max_retry_backoff)
    }
}

/// Errors that fail a whole run. Per-record failures are reported in the [`ProcessingReport`].
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("failed to list item ids: {0}")]
    ListIds(#[from] DbError),

    #[error("failed to submit work to the worker pool: {0}")]
    Submit(#[from] PoolError),

    /// The run's coordinating task panicked or was aborted
    #[error("processing run did not complete: {0}")]
    Join(#[from] JoinError),
}

/// Runs item processing on a shared worker pool.
#[derive(Clone)]
pub struct ItemProcessor {
    store: Arc<dyn ItemStore>,
    pool: Arc<WorkerPool>,
    config: ProcessorConfig,
}

impl ItemProcessor {
    pub fn new(store: Arc<dyn ItemStore>, pool: Arc<WorkerPool>, config: ProcessorConfig) -> Self {
        Self { store, pool, config }
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Start processing every stored item.
    ///
    /// Returns immediately. The handle resolves once every partition task has finished, and
    /// carries the complete set of outcomes at that point. Dropping the handle does not stop
    /// the run; use [`ProcessingHandle::cancel`] for that.
    pub fn process_all(&self) -> ProcessingHandle {
        let run_id = RunId::new();
        let cancel = self.pool.child_token();

        let run = Run {
            run_id,
            store: self.store.clone(),
            pool: self.pool.clone(),
            config: self.config.clone(),
            cancel: cancel.clone(),
        };
        let span = tracing::info_span!("process_all", run_id = %run_id);
        let inner = self.pool.spawn_tracked(run.execute().instrument(span));

        ProcessingHandle { run_id, cancel, inner }
    }
}

/// Completion handle for one run; a future resolving to the run's [`ProcessingReport`].
pub struct ProcessingHandle {
    run_id: RunId,
    cancel: CancellationToken,
    inner: JoinHandle<Result<ProcessingReport, ProcessingError>>,
}

impl ProcessingHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Cancel the run. Records not yet completed are reported as failed with
    /// [`FailureReason::Cancelled`]; the handle still resolves to a full report.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Future for ProcessingHandle {
    type Output = Result<ProcessingReport, ProcessingError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.inner).poll(cx)) {
            Ok(result) => Poll::Ready(result),
            Err(join_error) => Poll::Ready(Err(ProcessingError::Join(join_error))),
        }
    }
}

/// Cross-task state for a single run. Fresh for every run.
#[derive(Default)]
struct RunState {
    outcomes: Mutex<Vec<RecordOutcome>>,
    processed: AtomicUsize,
}

impl RunState {
    fn record(&self, outcome: RecordOutcome) {
        if matches!(outcome, RecordOutcome::Processed(_)) {
            self.processed.fetch_add(1, Ordering::Relaxed);
        }
        self.outcomes.lock().push(outcome);
    }

    fn fail_all(&self, ids: &[ItemId], processed_by: Option<&WorkerId>, reason: FailureReason) {
        let mut outcomes = self.outcomes.lock();
        outcomes.extend(ids.iter().map(|&id| {
            RecordOutcome::Failed(FailedItem {
                id,
                processed_by: processed_by.cloned(),
                reason: reason.clone(),
            })
        }));
    }
}

struct Run {
    run_id: RunId,
    store: Arc<dyn ItemStore>,
    pool: Arc<WorkerPool>,
    config: ProcessorConfig,
    cancel: CancellationToken,
}

impl Run {
    async fn execute(self) -> Result<ProcessingReport, ProcessingError> {
        let ids = self.store.list_ids().await?;
        if ids.is_empty() {
            tracing::info!("No items to process");
            return Ok(ProcessingReport::empty(self.run_id));
        }

        let state = Arc::new(RunState::default());
        let partitions = partition(&ids, self.pool.worker_count());

        tracing::info!(
            items = ids.len(),
            partitions = partitions.len(),
            "Dispatching partitions to worker pool"
        );

        let mut tasks = Vec::with_capacity(partitions.len());
        for part in partitions {
            let task = PartitionTask {
                ids: part.to_vec(),
                store: self.store.clone(),
                state: state.clone(),
                config: self.config.clone(),
                cancel: self.cancel.clone(),
            };

            match self.pool.submit(move |worker| task.run(worker)) {
                Ok(handle) => tasks.push((part, handle)),
                Err(e) => {
                    tracing::error!(error = %e, "Worker pool rejected partition, cancelling run");
                    self.cancel.cancel();
                    futures::future::join_all(tasks.into_iter().map(|(_, handle)| handle)).await;
                    return Err(e.into());
                }
            }
        }

        let (parts, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        let results = futures::future::join_all(handles).await;

        for (part, result) in parts.into_iter().zip(results) {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(pool_error)) => {
                    tracing::warn!(error = %pool_error, ids = part.len(), "Partition never ran");
                    state.fail_all(part, None, FailureReason::Cancelled);
                }
                Err(join_error) => {
                    tracing::error!(error = %join_error, "Partition task panicked");
                    let reported: HashSet<ItemId> = state.outcomes.lock().iter().map(RecordOutcome::id).collect();
                    let missing: Vec<ItemId> = part.iter().copied().filter(|id| !reported.contains(id)).collect();
                    state.fail_all(&missing, None, FailureReason::Aborted(join_error.to_string()));
                }
            }
        }

        // Every task has been joined, so nothing else touches the state any more
        let outcomes = std::mem::take(&mut *state.outcomes.lock());
        let processed_count = state.processed.load(Ordering::Relaxed);
        let report = ProcessingReport::from_outcomes(self.run_id, outcomes, processed_count);

        let complete = report.total() == ids.len() && report.duplicate_ids().is_empty();
        if !complete {
            tracing::error!(
                expected = ids.len(),
                accounted = report.total(),
                duplicates = ?report.duplicate_ids(),
                "Processing report does not account for every item exactly once"
            );
        }
        debug_assert!(complete, "processing report must account for every item exactly once");

        tracing::info!(
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Processing run complete"
        );

        Ok(report)
    }
}

/// One partition's worth of work, run on a single worker slot.
struct PartitionTask {
    ids: Vec<ItemId>,
    store: Arc<dyn ItemStore>,
    state: Arc<RunState>,
    config: ProcessorConfig,
    cancel: CancellationToken,
}

impl PartitionTask {
    async fn run(self, worker: WorkerId) {
        let span = tracing::debug_span!("partition", worker = %worker, size = self.ids.len());
        self.process_partition(worker).instrument(span).await
    }

    async fn process_partition(self, worker: WorkerId) {
        let deadline = self.config.task_timeout.map(|timeout| Instant::now() + timeout);

        for (position, &id) in self.ids.iter().enumerate() {
            let interrupted = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Some(FailureReason::Cancelled),
                _ = wait_until(deadline) => Some(FailureReason::TimedOut),
                outcome = process_record(self.store.as_ref(), id, &worker, &self.config) => {
                    self.state.record(outcome);
                    None
                }
            };

            if let Some(reason) = interrupted {
                let remaining = &self.ids[position..];
                tracing::warn!(reason = %reason, remaining = remaining.len(), "Partition interrupted");
                self.state.fail_all(remaining, Some(&worker), reason);
                return;
            }
        }

        tracing::debug!("Partition complete");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Drive one record from PENDING to a terminal state.
async fn process_record(store: &dyn ItemStore, id: ItemId, worker: &WorkerId, config: &ProcessorConfig) -> RecordOutcome {
    if let Some(delay) = config.record_delay {
        tokio::time::sleep(delay).await;
    }

    let mut item = match store.get(id).await {
        Ok(Some(item)) => item,
        Ok(None) => {
            tracing::debug!(item_id = id, "Item vanished before processing, skipping");
            return RecordOutcome::Skipped(id);
        }
        Err(e) => {
            tracing::warn!(item_id = id, error = %e, "Failed to load item");
            return RecordOutcome::Failed(FailedItem {
                id,
                processed_by: Some(worker.clone()),
                reason: FailureReason::Load(e.to_string()),
            });
        }
    };

    item.status = status::PROCESSED.to_string();

    let mut attempt = 0;
    loop {
        match store.put(&item).await {
            Ok(saved) => {
                tracing::trace!(item_id = id, "Item processed");
                return RecordOutcome::Processed(ProcessedItem {
                    item: saved,
                    processed_by: worker.clone(),
                });
            }
            Err(DbError::NotFound) => {
                tracing::debug!(item_id = id, "Item deleted during processing, skipping");
                return RecordOutcome::Skipped(id);
            }
            Err(e) if attempt < config.persist_retries => {
                let backoff = config.calculate_backoff(attempt);
                tracing::warn!(
                    item_id = id,
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Failed to persist item, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(item_id = id, error = %e, "Failed to persist item");
                return RecordOutcome::Failed(FailedItem {
                    id,
                    processed_by: Some(worker.clone()),
                    reason: FailureReason::Persist(e.to_string()),
                });
            }
        }
    }
}
