//! Results produced by a processing run.

use std::collections::HashSet;

use thiserror::Error;

use crate::db::models::items::Item;
use crate::types::{ItemId, RunId, WorkerId};

/// A record that was updated to `PROCESSED`, annotated with the worker that did it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedItem {
    pub item: Item,
    pub processed_by: WorkerId,
}

/// Why a record ended up FAILED.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("failed to load item: {0}")]
    Load(String),

    #[error("failed to persist item: {0}")]
    Persist(String),

    /// The run was cancelled (explicitly, or by pool shutdown) before this record completed
    #[error("processing was cancelled")]
    Cancelled,

    /// The partition's deadline passed before this record completed
    #[error("processing timed out")]
    TimedOut,

    /// The task handling this record's partition died unexpectedly
    #[error("worker task aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub id: ItemId,
    /// `None` when the partition never got a worker slot
    pub processed_by: Option<WorkerId>,
    pub reason: FailureReason,
}

/// Terminal state of one record's processing unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Processed(ProcessedItem),
    /// The record no longer existed when the worker reached it
    Skipped(ItemId),
    Failed(FailedItem),
}

impl RecordOutcome {
    pub fn id(&self) -> ItemId {
        match self {
            RecordOutcome::Processed(processed) => processed.item.id,
            RecordOutcome::Skipped(id) => *id,
            RecordOutcome::Failed(failed) => failed.id,
        }
    }
}

/// Aggregate result of one `process_all` run. Ordering within each list is unspecified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingReport {
    pub run_id: RunId,
    pub processed: Vec<ProcessedItem>,
    pub skipped: Vec<ItemId>,
    pub failed: Vec<FailedItem>,
    /// Value of the run's shared tally of successfully processed records
    pub processed_count: usize,
}

impl ProcessingReport {
    pub fn empty(run_id: RunId) -> Self {
        Self {
            run_id,
            processed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            processed_count: 0,
        }
    }

    pub(crate) fn from_outcomes(run_id: RunId, outcomes: Vec<RecordOutcome>, processed_count: usize) -> Self {
        let mut report = Self::empty(run_id);
        report.processed_count = processed_count;
        for outcome in outcomes {
            match outcome {
                RecordOutcome::Processed(processed) => report.processed.push(processed),
                RecordOutcome::Skipped(id) => report.skipped.push(id),
                RecordOutcome::Failed(failed) => report.failed.push(failed),
            }
        }
        report
    }

    /// Number of records the run accounted for, in any terminal state
    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len() + self.failed.len()
    }

    /// Ids that were accounted for more than once. Always empty for a correct run.
    pub fn duplicate_ids(&self) -> Vec<ItemId> {
        let mut seen = HashSet::new();
        self.processed
            .iter()
            .map(|p| p.item.id)
            .chain(self.skipped.iter().copied())
            .chain(self.failed.iter().map(|f| f.id))
            .filter(|id| !seen.insert(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::items::status;

    fn processed(id: ItemId) -> RecordOutcome {
        RecordOutcome::Processed(ProcessedItem {
            item: Item {
                id,
                name: format!("Item{id}"),
                description: String::new(),
                status: status::PROCESSED.to_string(),
                email: None,
            },
            processed_by: WorkerId::from_slot(0),
        })
    }

    #[test]
    fn test_from_outcomes_splits_by_state() {
        let outcomes = vec![
            processed(1),
            RecordOutcome::Skipped(2),
            RecordOutcome::Failed(FailedItem {
                id: 3,
                processed_by: None,
                reason: FailureReason::Cancelled,
            }),
            processed(4),
        ];

        let report = ProcessingReport::from_outcomes(RunId::new(), outcomes, 2);

        assert_eq!(report.processed.len(), 2);
        assert_eq!(report.skipped, vec![2]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.total(), 4);
        assert_eq!(report.processed_count, 2);
        assert!(report.duplicate_ids().is_empty());
    }

    #[test]
    fn test_duplicate_ids_detected() {
        let report = ProcessingReport::from_outcomes(RunId::new(), vec![processed(1), RecordOutcome::Skipped(1)], 1);
        assert_eq!(report.duplicate_ids(), vec![1]);
    }

    #[test]
    fn test_failure_reason_messages() {
        assert_eq!(FailureReason::TimedOut.to_string(), "processing timed out");
        assert_eq!(
            FailureReason::Persist("connection reset".to_string()).to_string(),
            "failed to persist item: connection reset"
        );
    }
}
