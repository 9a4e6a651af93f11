//! Status and health endpoints

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;

use super::types::{
    EndpointsResponse, HealthReportResponse, LivenessResponse, StatusResponse, TypeHealthResponse,
};
use crate::state::AppState;

/// GET / - service summary
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let managers = state.registry.list_managers();

    Json(StatusResponse {
        service: "Universal Mirror Proxy",
        version: env!("CARGO_PKG_VERSION"),
        mirror_types: managers.keys().cloned().collect(),
        total_mirrors: managers.values().map(|m| m.mirror_count()).sum(),
        endpoints: EndpointsResponse {
            docker_v2: "/v2/",
            pypi_simple: "/simple/{package}/",
            health: "/health",
            metrics: "/metrics",
        },
    })
}

/// GET /health - per-mirror health report
async fn health(State(state): State<AppState>) -> Json<HealthReportResponse> {
    // Record health check metric
    metrics::counter!("mirava_health_checks_total").increment(1);

    let types = state
        .registry
        .list_managers()
        .iter()
        .map(|(name, manager)| (name.clone(), TypeHealthResponse::from(manager.as_ref())))
        .collect();

    Json(HealthReportResponse {
        timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        types,
    })
}

/// GET /healthz - liveness probe
async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create status and health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
        .route("/healthz", get(liveness))
}
