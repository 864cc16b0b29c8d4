//! HTTP request handlers.
//!
//! Handlers validate the request body, call the item store or the batch processor, and map the
//! result to a response model. Failures are returned as [`crate::errors::Error`], which converts
//! itself into an HTTP response.

pub mod items;
