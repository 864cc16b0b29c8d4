//! # itemctl: item management with concurrent batch processing
//!
//! `itemctl` is a small HTTP service over a store of items. Besides the usual CRUD endpoints it
//! exposes a "process everything" operation: every stored item is marked `PROCESSED` by a fixed
//! pool of named workers, and the caller gets back the complete, per-item result of the run.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum). Items live in an [`ItemStore`],
//! either in process memory or in PostgreSQL (via sqlx), selected by configuration.
//!
//! A single [`WorkerPool`] is created at startup and shared by every processing run. A run lists
//! all item ids, splits them into at most `worker_count` contiguous partitions and submits one task
//! per partition. Overlapping runs queue for worker slots rather than assuming exclusive access.
//! On shutdown the pool stops accepting work, cancels in-flight runs and joins every task.
//!
//! ## Modules
//!
//! - [`api`]: handlers and request/response models
//! - [`db`]: the store trait, its implementations and the stored model
//! - [`processing`]: partitioning, the worker pool and the batch processor
//! - [`config`]: YAML + environment configuration
//!
//! ## Getting started
//!
//! ```bash
//! # In-memory store on port 8080
//! itemctl -f config.yaml
//!
//! # PostgreSQL store
//! DATABASE_URL=postgres://localhost/itemctl itemctl
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod processing;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    config::StoreConfig,
    db::handlers::{InMemoryItemStore, ItemStore, PostgresItemStore},
    openapi::ApiDoc,
    processing::{ItemProcessor, ProcessorConfig, WorkerPool},
};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .store(store)
///     .processor(processor)
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
    pub processor: ItemProcessor,
    pub config: Config,
}

/// Get the itemctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Build the item store selected by the configuration.
///
/// For PostgreSQL this connects, runs pending migrations and returns the pool alongside the store
/// so it can be closed on shutdown.
#[instrument(skip_all, err)]
pub async fn setup_store(config: &Config) -> anyhow::Result<(Arc<dyn ItemStore>, Option<PgPool>)> {
    match &config.store {
        StoreConfig::InMemory => {
            info!("Using in-memory item store");
            Ok((Arc::new(InMemoryItemStore::new()), None))
        }
        StoreConfig::Postgres { url, pool: settings } => {
            info!("Connecting to PostgreSQL item store");
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .min_connections(settings.min_connections)
                .acquire_timeout(settings.acquire_timeout)
                .connect(url)
                .await?;

            migrator().run(&pool).await?;
            debug!("Migrations applied");

            Ok((Arc::new(PostgresItemStore::new(pool.clone())), Some(pool)))
        }
    }
}

/// Create the shared worker pool and the processor that runs on it
pub fn setup_processor(config: &Config, store: Arc<dyn ItemStore>) -> ItemProcessor {
    let worker_count = config.processing.worker_count();
    info!(worker_count = worker_count.get(), "Starting worker pool");

    let pool = Arc::new(WorkerPool::new(worker_count));
    ItemProcessor::new(store, pool, ProcessorConfig::from(&config.processing))
}

/// Build the application router: item API under `/api`, health check and API docs.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/items",
            get(api::handlers::items::list_items).post(api::handlers::items::create_item),
        )
        .route("/items/repeatable", post(api::handlers::items::create_repeatable_items))
        .route("/items/process", get(api::handlers::items::process_items))
        .route(
            "/items/{item_id}",
            get(api::handlers::items::get_item)
                .put(api::handlers::items::update_item)
                .delete(api::handlers::items::delete_item),
        )
        .with_state(state);

    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Main application struct that owns the router, the worker pool and the store connections.
///
/// 1. **Create**: [`Application::new`] builds the store (running migrations for PostgreSQL) and
///    starts the worker pool
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, the worker pool is drained and the
///    database pool closed
pub struct Application {
    router: Router,
    app_state: AppState,
    config: Config,
    db_pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting itemctl with configuration: {:#?}", config);

        let (store, db_pool) = setup_store(&config).await?;
        let processor = setup_processor(&config, store.clone());

        let app_state = AppState::builder()
            .store(store)
            .processor(processor)
            .config(config.clone())
            .build();

        let router = build_router(app_state.clone());

        Ok(Self {
            router,
            app_state,
            config,
            db_pool,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, AppState) {
        let server = axum_test::TestServer::new(self.router).expect("Failed to create test server");
        (server, self.app_state)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "itemctl listening on http://{}, docs at http://localhost:{}/docs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        // Stop accepting work and wait for in-flight runs to wind down
        self.app_state.processor.pool().shutdown().await;

        if let Some(pool) = self.db_pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::create_test_config;

    #[tokio::test]
    async fn test_application_with_in_memory_store() {
        let app = Application::new(create_test_config()).await.unwrap();
        let (server, state) = app.into_test_server();

        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");

        assert_eq!(state.processor.pool().worker_count().get(), state.config.processing.worker_count);
    }

    #[tokio::test]
    async fn test_docs_are_served() {
        let app = Application::new(create_test_config()).await.unwrap();
        let (server, _state) = app.into_test_server();

        server.get("/docs").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = Application::new(create_test_config()).await.unwrap();
        let (server, _state) = app.into_test_server();

        server.get("/api/widgets").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_serve_drains_worker_pool_on_shutdown() {
        let mut config = create_test_config();
        config.host = "127.0.0.1".to_string();
        config.port = 0;

        let app = Application::new(config).await.unwrap();
        let pool = app.app_state.processor.pool().clone();

        app.serve(async {}).await.unwrap();

        assert!(pool.is_shut_down());
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_postgres_store_round_trip(pool: PgPool) {
        let store = PostgresItemStore::new(pool);
        let mut config = create_test_config();
        config.processing.worker_count = 3;

        let processor = setup_processor(&config, Arc::new(store.clone()));
        let state = AppState::builder()
            .store(Arc::new(store) as Arc<dyn ItemStore>)
            .processor(processor)
            .config(config)
            .build();
        let server = axum_test::TestServer::new(build_router(state.clone())).unwrap();

        for i in 0..5 {
            server
                .post("/api/items")
                .json(&serde_json::json!({"name": format!("Item{i}")}))
                .await
                .assert_status(axum::http::StatusCode::CREATED);
        }

        let response = server.get("/api/items/process").await;
        response.assert_status_ok();
        let body: api::models::items::ProcessItemsResponse = response.json();
        assert_eq!(body.processed_count, 5);
        assert!(state.store.list().await.unwrap().iter().all(|item| item.is_processed()));
    }
}
