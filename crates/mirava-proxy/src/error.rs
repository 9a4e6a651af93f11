//! Proxy error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream unreachable: {0}")]
    Unreachable(String),

    #[error("Upstream timed out: {0}")]
    Timeout(String),
}
