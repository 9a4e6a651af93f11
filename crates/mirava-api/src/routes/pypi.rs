//! Python package index (simple API) pass-through

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use mirava_core::{CoreError, ForwardPolicy, ForwardRequest};
use tracing::info;

use super::registry::SERVED_BY;
use crate::error::ApiError;
use crate::state::AppState;

/// Upstream type served by these routes
pub const MIRROR_TYPE: &str = "pypi";

const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// A package name must stay a single path segment on the mirror
fn validate_package(package: &str) -> Result<(), ApiError> {
    if package.is_empty() || package.contains(['/', '\\']) || package.contains("..") {
        return Err(ApiError::BadRequest(format!(
            "Invalid package name: '{}'",
            package
        )));
    }
    Ok(())
}

/// GET /simple/{package}/
async fn package_page(
    State(state): State<AppState>,
    Path(package): Path<String>,
) -> Result<Response, ApiError> {
    validate_package(&package)?;
    let manager = state.registry.get(MIRROR_TYPE)?;
    let request = ForwardRequest::new(Method::GET, format!("/{}/", package));

    let served = match state
        .router
        .execute(&manager, &request, ForwardPolicy::PackageIndex)
        .await
    {
        Ok(served) => served,
        Err(CoreError::AllMirrorsExhausted { .. }) => {
            return Err(ApiError::NotFound(format!(
                "Package '{}' not found on any mirrors",
                package
            )));
        }
        Err(e) => return Err(e.into()),
    };

    info!("[{}] Serving '{}'", served.mirror.name(), package);

    let content_type = served
        .response
        .headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let mut response = Response::new(Body::from_stream(served.response.body));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Ok(value) = HeaderValue::from_str(served.mirror.name()) {
        headers.insert(SERVED_BY, value);
    }

    Ok(response)
}

/// Create package index routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/simple/{package}/", get(package_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_package() {
        assert!(validate_package("requests").is_ok());
        assert!(validate_package("zope.interface").is_ok());
        assert!(validate_package("../x").is_err());
        assert!(validate_package("a/b").is_err());
        assert!(validate_package("a\\b").is_err());
        assert!(validate_package("..").is_err());
    }
}
