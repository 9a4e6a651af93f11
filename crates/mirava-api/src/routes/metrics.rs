//! Prometheus exposition of the mirror counters

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use std::sync::Arc;

use crate::state::MetricsHandle;

/// Create the `/metrics` route; it carries its own state so it can be merged
/// after the application state has been applied
pub fn routes(handle: Arc<MetricsHandle>) -> Router {
    Router::new()
        .route("/metrics", get(render))
        .with_state(handle)
}

/// GET /metrics
async fn render(State(handle): State<Arc<MetricsHandle>>) -> impl IntoResponse {
    handle.render()
}
