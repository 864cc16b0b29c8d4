//! Persistence layer for items.
//!
//! The [`handlers::ItemStore`] trait is the data access seam used by both the API handlers and the
//! batch processor. Two implementations exist: [`handlers::InMemoryItemStore`] for development and
//! tests, and [`handlers::PostgresItemStore`] backed by sqlx.

pub mod errors;
pub mod handlers;
pub mod models;
