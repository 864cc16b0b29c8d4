//! PostgreSQL item store.

use sqlx::PgPool;
use tracing::instrument;

use crate::db::errors::{DbError, Result};
use crate::db::models::items::{Item, NewItem};
use crate::types::ItemId;

use super::ItemStore;

/// Item store backed by the `items` table.
///
/// Each call checks a connection out of the pool, so the store can be shared freely between
/// concurrent worker tasks.
#[derive(Clone)]
pub struct PostgresItemStore {
    pool: PgPool,
}

impl PostgresItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl ItemStore for PostgresItemStore {
    #[instrument(skip(self), err)]
    async fn list_ids(&self) -> Result<Vec<ItemId>> {
        let ids = sqlx::query_scalar::<_, ItemId>("SELECT id FROM items ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, status, email
            FROM items
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: ItemId) -> Result<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, status, email
            FROM items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    #[instrument(skip(self, item), fields(name = %item.name), err)]
    async fn create(&self, item: &NewItem) -> Result<Item> {
        let created = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (name, description, status, email)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, status, email
            "#,
        )
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.status)
        .bind(&item.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// All copies are inserted in a single transaction
    #[instrument(skip(self, item), fields(name = %item.name), err)]
    async fn create_many(&self, item: &NewItem, count: usize) -> Result<Vec<Item>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(count);
        for _ in 0..count {
            let row = sqlx::query_as::<_, Item>(
                r#"
                INSERT INTO items (name, description, status, email)
                VALUES ($1, $2, $3, $4)
                RETURNING id, name, description, status, email
                "#,
            )
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.status)
            .bind(&item.email)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }
        tx.commit().await?;
        Ok(created)
    }

    #[instrument(skip(self, item), fields(id = item.id), err)]
    async fn put(&self, item: &Item) -> Result<Item> {
        let updated = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET name = $2, description = $3, status = $4, email = $5
            WHERE id = $1
            RETURNING id, name, description, status, email
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.status)
        .bind(&item.email)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn exists(&self, id: ItemId) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM items WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, id: ItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
