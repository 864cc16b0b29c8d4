//! Bounded worker pool shared by every processing run.
//!
//! The pool is created once when the application starts and lives until shutdown. It hands out
//! `worker_count` named slots; a submitted task waits (FIFO) until a slot is free, runs with that
//! slot's [`WorkerId`], and returns the slot when it finishes. Overlapping runs simply queue for
//! slots, so no run assumes exclusive access.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::types::WorkerId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool has been shut down and accepts no more work
    #[error("worker pool is shut down")]
    ShutDown,

    /// A permit was granted but no slot was free; slots and permits are out of sync
    #[error("no free worker slot despite an available permit")]
    SlotUnavailable,
}

/// A claimed worker slot. The slot goes back to the pool when the lease is dropped.
struct WorkerLease {
    _permit: OwnedSemaphorePermit,
    slot: usize,
    worker: WorkerId,
    free_slots: Arc<Mutex<Vec<usize>>>,
}

impl Drop for WorkerLease {
    fn drop(&mut self) {
        self.free_slots.lock().push(self.slot);
    }
}

pub struct WorkerPool {
    worker_count: NonZeroUsize,
    semaphore: Arc<Semaphore>,
    free_slots: Arc<Mutex<Vec<usize>>>,
    tracker: TaskTracker,
    shutdown_token: CancellationToken,
    tasks_in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(worker_count: NonZeroUsize) -> Self {
        // Reversed so that slot 0 is handed out first
        let free_slots = (0..worker_count.get()).rev().collect();

        Self {
            worker_count,
            semaphore: Arc::new(Semaphore::new(worker_count.get())),
            free_slots: Arc::new(Mutex::new(free_slots)),
            tracker: TaskTracker::new(),
            shutdown_token: CancellationToken::new(),
            tasks_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn worker_count(&self) -> NonZeroUsize {
        self.worker_count
    }

    /// Number of tasks currently holding a worker slot
    pub fn tasks_in_flight(&self) -> usize {
        self.tasks_in_flight.load(Ordering::Relaxed)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// A token that is cancelled when the pool shuts down. Runs derive their own cancellation
    /// tokens from it.
    pub fn child_token(&self) -> CancellationToken {
        self.shutdown_token.child_token()
    }

    /// Submit a unit of work.
    ///
    /// The returned handle resolves once `work` has run on a worker slot. If the pool shuts down
    /// while the task is still waiting for a slot, the handle resolves to
    /// [`PoolError::ShutDown`] and `work` never runs.
    ///
    /// # Errors
    /// - [`PoolError::ShutDown`] if the pool no longer accepts work
    pub fn submit<F, Fut>(&self, work: F) -> Result<JoinHandle<Result<Fut::Output, PoolError>>, PoolError>
    where
        F: FnOnce(WorkerId) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        if self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }

        let semaphore = self.semaphore.clone();
        let free_slots = self.free_slots.clone();
        let tasks_in_flight = self.tasks_in_flight.clone();

        Ok(self.tracker.spawn(async move {
            let lease = acquire(semaphore, free_slots).await?;

            tasks_in_flight.fetch_add(1, Ordering::Relaxed);
            let _guard = scopeguard::guard((), |_| {
                tasks_in_flight.fetch_sub(1, Ordering::Relaxed);
            });

            tracing::trace!(worker = %lease.worker, "Worker slot acquired");
            Ok(work(lease.worker.clone()).await)
        }))
    }

    /// Spawn a task that is tracked by the pool (and so awaited on shutdown) but does not occupy
    /// a worker slot. Used for run coordinators, which only wait on their partition tasks.
    pub(crate) fn spawn_tracked<Fut>(&self, future: Fut) -> JoinHandle<Fut::Output>
    where
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        self.tracker.spawn(future)
    }

    /// Stop accepting work, cancel running runs and wait for every tracked task to finish.
    pub async fn shutdown(&self) {
        tracing::info!(tasks_in_flight = self.tasks_in_flight(), "Shutting down worker pool");
        self.shutdown_token.cancel();
        self.semaphore.close();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("Worker pool shut down");
    }
}

async fn acquire(semaphore: Arc<Semaphore>, free_slots: Arc<Mutex<Vec<usize>>>) -> Result<WorkerLease, PoolError> {
    let permit = semaphore.acquire_owned().await.map_err(|_| PoolError::ShutDown)?;
    let slot = free_slots.lock().pop().ok_or(PoolError::SlotUnavailable)?;

    Ok(WorkerLease {
        _permit: permit,
        slot,
        worker: WorkerId::from_slot(slot),
        free_slots,
    })
}
