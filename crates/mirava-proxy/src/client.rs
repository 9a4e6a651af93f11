//! Upstream mirror client

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use http::{HeaderMap, Method, StatusCode};
use reqwest::Client;
use tracing::{debug, info};

use crate::error::ProxyError;

/// Response body as an opaque stream of chunks
pub type ByteStream = BoxStream<'static, Result<Bytes, ProxyError>>;

/// Mirror client configuration
#[derive(Clone, Debug)]
pub struct MirrorClientConfig {
    /// Timeout for a whole request, including reading the response headers
    pub timeout: Duration,
    /// Timeout for establishing the TCP/TLS connection
    pub connect_timeout: Duration,
    /// Skip TLS certificate verification
    pub skip_tls_verify: bool,
}

impl Default for MirrorClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            skip_tls_verify: false,
        }
    }
}

/// A request to be sent to one mirror
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Absolute URL (mirror base URL joined with the forwarded path)
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl UpstreamRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// A response received from a mirror
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl UpstreamResponse {
    /// Build a response from a fully buffered body
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self {
            status,
            headers,
            body: stream::once(async move { Ok(body) }).boxed(),
        }
    }

    /// Drain the body into memory
    pub async fn into_bytes(self) -> Result<Bytes, ProxyError> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        Ok(Bytes::from(chunks.concat()))
    }
}

impl fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Sends a single request to a single mirror.
///
/// Implementations own connection pooling, TLS, redirects and timeouts.
/// A returned `Err` always means the mirror could not produce a response;
/// any HTTP status, including 5xx, comes back as `Ok`.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ProxyError>;
}

/// reqwest-backed client shared by every request in the process
pub struct MirrorClient {
    client: Client,
}

impl MirrorClient {
    /// Create a new mirror client
    pub fn new(config: MirrorClientConfig) -> Result<Self, ProxyError> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout);

        if config.skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;

        info!(
            "Created mirror client (timeout: {:?}, connect timeout: {:?})",
            config.timeout, config.connect_timeout
        );

        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamClient for MirrorClient {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ProxyError> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map_err(ProxyError::from).boxed();

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify_error(err: reqwest::Error) -> ProxyError {
    if err.is_timeout() {
        ProxyError::Timeout(err.to_string())
    } else if err.is_connect() {
        ProxyError::Unreachable(err.to_string())
    } else {
        ProxyError::Http(err)
    }
}
