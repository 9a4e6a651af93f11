//! Mirava REST API
//!
//! This crate provides the Axum-based HTTP surface for Mirava:
//! the proxied registry and package index routes, status and health
//! reporting, and runtime mirror management.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
