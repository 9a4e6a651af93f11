//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mirava_core::CoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", msg.clone()),
            ApiError::Core(e) => match e {
                CoreError::UnknownMirrorType(_) | CoreError::MirrorNotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                CoreError::AllMirrorsExhausted { .. } => {
                    (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", e.to_string())
                }
            },
        };

        // OCI Distribution error envelope
        let body = axum::Json(json!({
            "errors": [{
                "code": code,
                "message": message,
                "detail": message
            }]
        }));

        (status, body).into_response()
    }
}
