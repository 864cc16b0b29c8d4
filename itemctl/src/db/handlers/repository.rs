//! Store trait for item persistence.

use crate::db::errors::Result;
use crate::db::models::items::{Item, NewItem};
use crate::types::ItemId;

/// Data access layer for items.
///
/// A store is shared between request handlers and the batch processor's worker tasks, so every
/// method takes `&self` and implementations are expected to serialise their own per-record writes.
/// Callers add no extra locking around store calls.
#[async_trait::async_trait]
pub trait ItemStore: Send + Sync {
    /// List every item identifier, in ascending order
    async fn list_ids(&self) -> Result<Vec<ItemId>>;

    /// List every item, in ascending id order
    async fn list(&self) -> Result<Vec<Item>>;

    /// Get an item by ID
    async fn get(&self, id: ItemId) -> Result<Option<Item>>;

    /// Create a new item, assigning it an ID
    async fn create(&self, item: &NewItem) -> Result<Item>;

    /// Create `count` independent copies of the same item
    async fn create_many(&self, item: &NewItem, count: usize) -> Result<Vec<Item>> {
        let mut created = Vec::with_capacity(count);
        for _ in 0..count {
            created.push(self.create(item).await?);
        }
        Ok(created)
    }

    /// Overwrite an existing item.
    ///
    /// # Errors
    /// - `NotFound` if no item with `item.id` exists
    async fn put(&self, item: &Item) -> Result<Item>;

    /// Check whether an item exists
    async fn exists(&self, id: ItemId) -> Result<bool>;

    /// Delete an item by ID, returning whether anything was removed
    async fn delete(&self, id: ItemId) -> Result<bool>;
}
