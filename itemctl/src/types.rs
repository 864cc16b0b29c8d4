//! Common identifier types.
//!
//! - [`ItemId`]: store-assigned item identifier
//! - [`WorkerId`]: name of the worker slot that handled a record during processing
//! - [`RunId`]: identifier of a single `process_all` invocation, used to correlate logs

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type ItemId = i64;

/// Name of a worker pool slot, e.g. `item-worker-3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn from_slot(slot: usize) -> Self {
        Self(format!("item-worker-{slot}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for one processing run.
///
/// Displays as a short, readable "run_xxxxxxxx" instead of the full UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RunId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run_{}", abbrev_uuid(&self.0))
    }
}

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_id_from_slot() {
        assert_eq!(WorkerId::from_slot(3).as_str(), "item-worker-3");
        assert_eq!(WorkerId::from_slot(0).to_string(), "item-worker-0");
    }

    #[test]
    fn test_run_id_display_is_short() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(RunId::from(uuid).to_string(), "run_550e8400");
    }
}
