//! In-memory item store.
//!
//! Items live in a lock-protected ordered map. Suitable for tests and single-process deployments;
//! everything is lost on restart.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;

use crate::db::errors::{DbError, Result};
use crate::db::models::items::{Item, NewItem};
use crate::types::ItemId;

use super::ItemStore;

/// In-memory implementation of [`ItemStore`].
///
/// Cloning is cheap and every clone shares the same underlying map.
///
/// # Example
/// ```ignore
/// let store = InMemoryItemStore::new();
/// let item = store.create(&new_item).await?;
/// assert!(store.exists(item.id).await?);
/// ```
#[derive(Clone)]
pub struct InMemoryItemStore {
    items: Arc<RwLock<BTreeMap<ItemId, Item>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl Default for InMemoryItemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ItemStore for InMemoryItemStore {
    async fn list_ids(&self) -> Result<Vec<ItemId>> {
        Ok(self.items.read().keys().copied().collect())
    }

    async fn list(&self) -> Result<Vec<Item>> {
        Ok(self.items.read().values().cloned().collect())
    }

    async fn get(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.items.read().get(&id).cloned())
    }

    async fn create(&self, item: &NewItem) -> Result<Item> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let created = item.with_id(id);
        self.items.write().insert(id, created.clone());
        Ok(created)
    }

    async fn put(&self, item: &Item) -> Result<Item> {
        let mut items = self.items.write();
        match items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(item.clone())
            }
            None => Err(DbError::NotFound),
        }
    }

    async fn exists(&self, id: ItemId) -> Result<bool> {
        Ok(self.items.read().contains_key(&id))
    }

    async fn delete(&self, id: ItemId) -> Result<bool> {
        Ok(self.items.write().remove(&id).is_some())
    }
}
