//! Mirava Upstream Client
//!
//! This crate provides the HTTP client used to talk to upstream mirrors,
//! along with the request/response descriptors the failover loop works with.

pub mod client;
pub mod error;
pub mod headers;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::{
    ByteStream, MirrorClient, MirrorClientConfig, UpstreamClient, UpstreamRequest,
    UpstreamResponse,
};
pub use error::ProxyError;
pub use headers::{clean_headers, HOP_BY_HOP_HEADERS};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockBehavior, MockUpstreamClient};
