//! API routes

mod health;
pub mod metrics;
mod mirrors;
mod pypi;
mod registry;
pub mod types;

use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;

use crate::state::{AppState, MetricsHandle};

pub use registry::SERVED_BY;

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let mut router = Router::new()
        // Status and health
        .merge(health::routes())
        // Container registry (v2)
        .merge(registry::routes())
        // Package index
        .merge(pypi::routes())
        // Runtime mirror management
        .merge(mirrors::routes())
        .with_state(state)
        // Allow large blob uploads (2GB max)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024 * 1024));

    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router
}
