//! Runtime mirror management routes

use axum::{
    extract::{Path, Query, State},
    routing::post,
    Json, Router,
};
use tracing::info;
use url::Url;

use super::types::{AddMirrorQuery, AddMirrorResponse, ResetMirrorResponse};
use crate::error::ApiError;
use crate::state::AppState;

// ==================== Input Validation ====================

/// Maximum length for mirror name
const MAX_NAME_LENGTH: usize = 64;
/// Maximum length for URL
const MAX_URL_LENGTH: usize = 2048;

/// Only absolute http(s) URLs with a host are accepted as mirrors
fn validate_mirror_url(url_str: &str) -> Result<(), ApiError> {
    let url_str = url_str.trim();

    if url_str.len() > MAX_URL_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "URL exceeds maximum length of {} characters",
            MAX_URL_LENGTH
        )));
    }

    let url = Url::parse(url_str)
        .map_err(|e| ApiError::BadRequest(format!("Invalid URL format: {}", e)))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ApiError::BadRequest(format!(
                "URL scheme '{}' is not allowed. Only http and https are permitted",
                scheme
            )));
        }
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(ApiError::BadRequest("URL must have a host".to_string()));
    }

    Ok(())
}

/// Validate mirror name format and length
fn validate_mirror_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::BadRequest(
            "Mirror name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Mirror name exceeds maximum length of {} characters",
            MAX_NAME_LENGTH
        )));
    }

    // Must contain only alphanumeric, dashes, and underscores
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::BadRequest(
            "Mirror name must contain only alphanumeric characters, dashes, and underscores"
                .to_string(),
        ));
    }

    // Must start with alphanumeric
    if let Some(first) = name.chars().next()
        && !first.is_ascii_alphanumeric()
    {
        return Err(ApiError::BadRequest(
            "Mirror name must start with an alphanumeric character".to_string(),
        ));
    }

    Ok(())
}

// ==================== Handlers ====================

/// POST /mirrors/{mirror_type}?url=&name=&priority=
async fn add_mirror(
    State(state): State<AppState>,
    Path(mirror_type): Path<String>,
    Query(query): Query<AddMirrorQuery>,
) -> Result<Json<AddMirrorResponse>, ApiError> {
    let manager = state.registry.get(&mirror_type)?;

    validate_mirror_name(&query.name)?;
    validate_mirror_url(&query.url)?;

    let mirror = manager.add(&query.url, &query.name, query.priority);
    info!(
        "Registered {} mirror {} at runtime",
        mirror_type,
        mirror.name()
    );

    Ok(Json(AddMirrorResponse {
        status: "added",
        mirror_type,
        name: query.name,
        url: query.url,
    }))
}

/// POST /mirrors/{mirror_type}/{name}/reset
async fn reset_mirror(
    State(state): State<AppState>,
    Path((mirror_type, name)): Path<(String, String)>,
) -> Result<Json<ResetMirrorResponse>, ApiError> {
    state.registry.reset(&mirror_type, &name)?;

    Ok(Json(ResetMirrorResponse {
        status: "reset",
        mirror_type,
        name,
    }))
}

/// Create mirror management routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/mirrors/{mirror_type}", post(add_mirror))
        .route("/mirrors/{mirror_type}/{name}/reset", post(reset_mirror))
}
