//! Behavioural suite shared by every [`ItemStore`] implementation.

use rstest::{fixture, rstest};
use sqlx::PgPool;

use crate::db::errors::DbError;
use crate::db::handlers::{InMemoryItemStore, ItemStore, PostgresItemStore};
use crate::db::models::items::{NewItem, status};

fn sample_item(name: &str) -> NewItem {
    NewItem {
        name: name.to_string(),
        description: format!("{name} description"),
        status: status::NEW.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase())),
    }
}

#[fixture]
fn in_memory_store() -> InMemoryItemStore {
    InMemoryItemStore::new()
}

async fn run_test_create_assigns_increasing_ids<S: ItemStore>(store: &S) {
    let first = store.create(&sample_item("First")).await.unwrap();
    let second = store.create(&sample_item("Second")).await.unwrap();

    assert!(second.id > first.id);
    assert_eq!(first.name, "First");
    assert_eq!(first.status, status::NEW);

    let ids = store.list_ids().await.unwrap();
    assert_eq!(ids, vec![first.id, second.id]);
}

async fn run_test_get_missing_returns_none<S: ItemStore>(store: &S) {
    assert!(store.get(424242).await.unwrap().is_none());
    assert!(!store.exists(424242).await.unwrap());
}

async fn run_test_put_overwrites_existing<S: ItemStore>(store: &S) {
    let mut item = store.create(&sample_item("Widget")).await.unwrap();
    item.status = status::PROCESSED.to_string();
    item.email = None;

    let saved = store.put(&item).await.unwrap();
    assert_eq!(saved, item);

    let fetched = store.get(item.id).await.unwrap().unwrap();
    assert!(fetched.is_processed());
    assert_eq!(fetched.email, None);
}

async fn run_test_put_missing_is_not_found<S: ItemStore>(store: &S) {
    let ghost = sample_item("Ghost").with_id(999_999);
    let err = store.put(&ghost).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
    assert!(store.list().await.unwrap().is_empty());
}

async fn run_test_delete<S: ItemStore>(store: &S) {
    let item = store.create(&sample_item("Doomed")).await.unwrap();
    assert!(store.exists(item.id).await.unwrap());

    assert!(store.delete(item.id).await.unwrap());
    assert!(!store.exists(item.id).await.unwrap());
    // Second delete is a no-op
    assert!(!store.delete(item.id).await.unwrap());
}

async fn run_test_create_many<S: ItemStore>(store: &S) {
    let created = store.create_many(&sample_item("Copy"), 3).await.unwrap();
    assert_eq!(created.len(), 3);

    let all = store.list().await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|item| item.name == "Copy"));

    let mut ids: Vec<_> = all.iter().map(|item| item.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 3, "copies must get distinct ids");
}

#[rstest]
#[tokio::test]
async fn test_create_assigns_increasing_ids(in_memory_store: InMemoryItemStore) {
    run_test_create_assigns_increasing_ids(&in_memory_store).await;
}

#[rstest]
#[tokio::test]
async fn test_get_missing_returns_none(in_memory_store: InMemoryItemStore) {
    run_test_get_missing_returns_none(&in_memory_store).await;
}

#[rstest]
#[tokio::test]
async fn test_put_overwrites_existing(in_memory_store: InMemoryItemStore) {
    run_test_put_overwrites_existing(&in_memory_store).await;
}

#[rstest]
#[tokio::test]
async fn test_put_missing_is_not_found(in_memory_store: InMemoryItemStore) {
    run_test_put_missing_is_not_found(&in_memory_store).await;
}

#[rstest]
#[tokio::test]
async fn test_delete(in_memory_store: InMemoryItemStore) {
    run_test_delete(&in_memory_store).await;
}

#[rstest]
#[tokio::test]
async fn test_create_many(in_memory_store: InMemoryItemStore) {
    run_test_create_many(&in_memory_store).await;
}

#[tokio::test]
async fn test_in_memory_clones_share_state() {
    let store = InMemoryItemStore::new();
    let clone = store.clone();
    clone.create(&sample_item("Shared")).await.unwrap();
    assert_eq!(store.len(), 1);
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_create_assigns_increasing_ids_postgres(pool: PgPool) {
    run_test_create_assigns_increasing_ids(&PostgresItemStore::new(pool)).await;
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_get_missing_returns_none_postgres(pool: PgPool) {
    run_test_get_missing_returns_none(&PostgresItemStore::new(pool)).await;
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_put_overwrites_existing_postgres(pool: PgPool) {
    run_test_put_overwrites_existing(&PostgresItemStore::new(pool)).await;
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_put_missing_is_not_found_postgres(pool: PgPool) {
    run_test_put_missing_is_not_found(&PostgresItemStore::new(pool)).await;
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_delete_postgres(pool: PgPool) {
    run_test_delete(&PostgresItemStore::new(pool)).await;
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
async fn test_create_many_postgres(pool: PgPool) {
    run_test_create_many(&PostgresItemStore::new(pool)).await;
}
