//! Database models for items.

use crate::types::ItemId;
use serde::{Deserialize, Serialize};

/// Status values the service itself assigns. The column is free-form text, so callers may store
/// any other value too.
pub mod status {
    pub const NEW: &str = "NEW";
    pub const PROCESSED: &str = "PROCESSED";
}

/// A persisted item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub status: String,
    pub email: Option<String>,
}

impl Item {
    pub fn is_processed(&self) -> bool {
        self.status == status::PROCESSED
    }
}

/// Insert payload; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub status: String,
    pub email: Option<String>,
}

impl NewItem {
    pub fn with_id(&self, id: ItemId) -> Item {
        Item {
            id,
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
            email: self.email.clone(),
        }
    }
}
