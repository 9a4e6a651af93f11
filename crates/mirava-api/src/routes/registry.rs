//! Container registry (OCI Distribution v2) pass-through

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, Method, Uri},
    response::Response,
    routing::{on, MethodFilter},
    Router,
};
use mirava_core::{CoreError, ForwardPolicy, ForwardRequest, Served};
use mirava_proxy::clean_headers;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Upstream type served by these routes
pub const MIRROR_TYPE: &str = "docker";

/// Header naming the mirror that produced a response
pub const SERVED_BY: &str = "x-served-by";

/// GET|HEAD /v2/
async fn proxy_root(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    proxy(&state, method, "/v2/".to_string(), &uri, &headers, None).await
}

/// GET|HEAD|POST /v2/{*path}
async fn proxy_path(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body = matches!(method, Method::POST | Method::PUT).then_some(body);
    proxy(&state, method, format!("/v2/{}", path), &uri, &headers, body).await
}

async fn proxy(
    state: &AppState,
    method: Method,
    path: String,
    uri: &Uri,
    headers: &HeaderMap,
    body: Option<Bytes>,
) -> Result<Response, ApiError> {
    debug!("Docker {} {}", method, path);

    let manager = state.registry.get(MIRROR_TYPE)?;
    let is_head = method == Method::HEAD;
    let request = ForwardRequest::new(method, path)
        .with_query(uri.query().map(str::to_string))
        .with_headers(clean_headers(headers))
        .with_body(body);

    match state
        .router
        .execute(&manager, &request, ForwardPolicy::Registry)
        .await
    {
        Ok(served) => Ok(forwarded_response(served, is_head)),
        Err(CoreError::AllMirrorsExhausted { .. }) => Err(ApiError::BadGateway(
            "All Docker mirrors failed".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Relay an upstream response: filtered headers, tagged with the mirror name.
///
/// HEAD responses carry no body, so the upstream Content-Length is kept to
/// report the size of the resource.
fn forwarded_response(served: Served, is_head: bool) -> Response {
    let Served { mirror, response } = served;

    let mut headers = clean_headers(&response.headers);
    if let Ok(value) = HeaderValue::from_str(mirror.name()) {
        headers.insert(SERVED_BY, value);
    }

    let body = if is_head {
        if let Some(length) = response.headers.get(header::CONTENT_LENGTH) {
            headers.insert(header::CONTENT_LENGTH, length.clone());
        }
        Body::empty()
    } else {
        Body::from_stream(response.body)
    };

    let mut forwarded = Response::new(body);
    *forwarded.status_mut() = response.status;
    *forwarded.headers_mut() = headers;
    forwarded
}

/// Create registry routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v2/",
            on(MethodFilter::GET.or(MethodFilter::HEAD), proxy_root),
        )
        .route(
            "/v2/{*path}",
            on(
                MethodFilter::GET
                    .or(MethodFilter::HEAD)
                    .or(MethodFilter::POST),
                proxy_path,
            ),
        )
}
