//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures, and their conversions to and from store records
//!
//! # API Structure
//!
//! - **Items** (`/api/items/*`): Item CRUD, bulk creation and batch processing
//! - **Health** (`/healthz`): Liveness check
//!
//! All endpoints are documented with `utoipa` annotations. Interactive documentation is served at
//! `/docs` when the server is running.

pub mod handlers;
pub mod models;
