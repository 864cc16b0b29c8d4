//! API request/response models for items.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::items::{Item, NewItem, status};
use crate::errors::Error;
use crate::processing::{FailedItem, ProcessedItem, ProcessingReport};
use crate::types::{ItemId, WorkerId};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("Invalid email regex"));

/// Check the fields shared by create and update requests
fn validate_fields(name: &str, email: Option<&str>) -> Result<(), Error> {
    if name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "name must not be empty".to_string(),
        });
    }

    if let Some(email) = email
        && !EMAIL_PATTERN.is_match(email)
    {
        return Err(Error::BadRequest {
            message: format!("'{email}' is not a valid email address"),
        });
    }

    Ok(())
}

/// Request body for creating a new item.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemCreate {
    /// Display name (must not be empty)
    #[schema(example = "Widget")]
    pub name: String,
    /// Free-form description
    #[serde(default)]
    #[schema(example = "A small widget")]
    pub description: String,
    /// Initial status, defaults to `NEW`
    #[serde(default)]
    #[schema(example = "NEW")]
    pub status: Option<String>,
    /// Contact address, validated when present
    #[serde(default)]
    #[schema(example = "owner@example.com")]
    pub email: Option<String>,
}

impl ItemCreate {
    pub fn validate(&self) -> Result<(), Error> {
        validate_fields(&self.name, self.email.as_deref())
    }

    pub fn into_new_item(self) -> NewItem {
        NewItem {
            name: self.name,
            description: self.description,
            status: self.status.unwrap_or_else(|| status::NEW.to_string()),
            email: self.email,
        }
    }
}

/// Request body for replacing an item's fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemUpdate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// New status. Keeps the current one when omitted.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ItemUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        validate_fields(&self.name, self.email.as_deref())
    }

    /// Overwrite `item`'s fields with this update, keeping its id
    pub fn apply_to(self, mut item: Item) -> Item {
        item.name = self.name;
        item.description = self.description;
        if let Some(status) = self.status {
            item.status = status;
        }
        item.email = self.email;
        item
    }
}

/// Request body for creating several identical items at once.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemRepeatableCreate {
    pub item: ItemCreate,
    /// Number of copies to create
    #[schema(example = 10, minimum = 1)]
    pub count: usize,
}

impl ItemRepeatableCreate {
    pub fn validate(&self, max_repeat: usize) -> Result<(), Error> {
        if self.count == 0 || self.count > max_repeat {
            return Err(Error::BadRequest {
                message: format!("count must be between 1 and {max_repeat}, got {}", self.count),
            });
        }
        self.item.validate()
    }
}

/// Item as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ItemResponse {
    #[schema(value_type = i64)]
    pub id: ItemId,
    pub name: String,
    pub description: String,
    #[schema(example = "PROCESSED")]
    pub status: String,
    pub email: Option<String>,
    /// Worker that processed this item, only set in processing results
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[schema(value_type = Option<String>, example = "item-worker-0")]
    pub processed_by: Option<WorkerId>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            status: item.status,
            email: item.email,
            processed_by: None,
        }
    }
}

impl From<ProcessedItem> for ItemResponse {
    fn from(processed: ProcessedItem) -> Self {
        Self {
            processed_by: Some(processed.processed_by),
            ..Self::from(processed.item)
        }
    }
}

/// An item the processing run could not complete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FailedItemResponse {
    #[schema(value_type = i64)]
    pub id: ItemId,
    #[schema(value_type = Option<String>)]
    pub processed_by: Option<WorkerId>,
    /// Human-readable failure reason
    #[schema(example = "processing timed out")]
    pub reason: String,
}

impl From<FailedItem> for FailedItemResponse {
    fn from(failed: FailedItem) -> Self {
        Self {
            id: failed.id,
            processed_by: failed.processed_by,
            reason: failed.reason.to_string(),
        }
    }
}

/// Result of a processing run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessItemsResponse {
    /// Run identifier, as it appears in the logs
    #[schema(example = "run_550e8400")]
    pub run_id: String,
    /// Number of items successfully processed
    pub processed_count: usize,
    /// Processed items, each annotated with its worker
    pub items: Vec<ItemResponse>,
    /// Ids of items that disappeared before they could be processed
    #[schema(value_type = Vec<i64>)]
    pub skipped: Vec<ItemId>,
    pub failed: Vec<FailedItemResponse>,
}

impl From<ProcessingReport> for ProcessItemsResponse {
    fn from(report: ProcessingReport) -> Self {
        Self {
            run_id: report.run_id.to_string(),
            processed_count: report.processed_count,
            items: report.processed.into_iter().map(ItemResponse::from).collect(),
            skipped: report.skipped,
            failed: report.failed.into_iter().map(FailedItemResponse::from).collect(),
        }
    }
}
