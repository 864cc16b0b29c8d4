//! Test utilities for integration testing (available with `test-utils` feature).

use std::sync::Arc;

use axum_test::TestServer;

use crate::{
    AppState, build_router,
    config::Config,
    db::{
        handlers::{InMemoryItemStore, ItemStore},
        models::items::{NewItem, status},
    },
    setup_processor,
    types::ItemId,
};

/// A test server over a fresh in-memory store, plus the state behind it
pub fn create_test_app() -> (TestServer, AppState) {
    create_test_app_with_config(create_test_config())
}

pub fn create_test_app_with_config(config: Config) -> (TestServer, AppState) {
    let store: Arc<dyn ItemStore> = Arc::new(InMemoryItemStore::new());
    let processor = setup_processor(&config, store.clone());

    let state = AppState::builder().store(store).processor(processor).config(config).build();
    let server = TestServer::new(build_router(state.clone())).expect("Failed to create test server");

    (server, state)
}

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    };
    config.processing.worker_count = 4;
    config.limits.max_repeat = 50;
    config
}

/// Insert `count` items named `Item1..=ItemN` and return their ids
pub async fn seed_items(state: &AppState, count: usize) -> Vec<ItemId> {
    let mut ids = Vec::with_capacity(count);
    for i in 1..=count {
        let item = state
            .store
            .create(&NewItem {
                name: format!("Item{i}"),
                description: format!("Desc{i}"),
                status: status::NEW.to_string(),
                email: Some(format!("item{i}@example.com")),
            })
            .await
            .expect("Failed to seed item");
        ids.push(item.id);
    }
    ids
}
