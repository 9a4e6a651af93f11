//! In-memory upstream client
//!
//! Scripted stand-in for [`MirrorClient`](crate::MirrorClient) used by tests
//! across the workspace. Behaviors are keyed by URL prefix so a test can
//! describe each mirror independently.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};
use parking_lot::Mutex;

use crate::client::{UpstreamClient, UpstreamRequest, UpstreamResponse};
use crate::error::ProxyError;

/// What the mock does when a request hits a given prefix
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Answer with a status, a body and optional content type
    Respond {
        status: StatusCode,
        body: Bytes,
        content_type: Option<&'static str>,
    },
    /// Fail as if the mirror could not be reached
    Unreachable(String),
    /// Never answer
    Hang,
}

impl MockBehavior {
    pub fn status(status: u16) -> Self {
        Self::Respond {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: Bytes::new(),
            content_type: None,
        }
    }

    pub fn body(status: u16, body: &'static str, content_type: &'static str) -> Self {
        Self::Respond {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: Bytes::from_static(body.as_bytes()),
            content_type: Some(content_type),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable(message.into())
    }
}

struct Rule {
    prefix: String,
    behaviors: VecDeque<MockBehavior>,
}

/// Scripted [`UpstreamClient`] that records every request it receives
#[derive(Default)]
pub struct MockUpstreamClient {
    rules: Mutex<Vec<Rule>>,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl MockUpstreamClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `behavior` for every request whose URL starts with `prefix`
    pub fn on(self, prefix: &str, behavior: MockBehavior) -> Self {
        self.on_sequence(prefix, vec![behavior])
    }

    /// Play `behaviors` in order for `prefix`; the last one repeats forever
    pub fn on_sequence(self, prefix: &str, behaviors: Vec<MockBehavior>) -> Self {
        self.rules.lock().push(Rule {
            prefix: prefix.to_string(),
            behaviors: behaviors.into(),
        });
        self
    }

    /// Requests seen so far, in arrival order
    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().clone()
    }

    /// URLs requested so far, in arrival order
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.url.clone()).collect()
    }

    fn next_behavior(&self, url: &str) -> Option<MockBehavior> {
        let mut rules = self.rules.lock();
        let rule = rules.iter_mut().find(|r| url.starts_with(&r.prefix))?;
        if rule.behaviors.len() > 1 {
            rule.behaviors.pop_front()
        } else {
            rule.behaviors.front().cloned()
        }
    }
}

#[async_trait]
impl UpstreamClient for MockUpstreamClient {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ProxyError> {
        let url = request.url.clone();
        self.requests.lock().push(request);

        match self.next_behavior(&url) {
            Some(MockBehavior::Respond {
                status,
                body,
                content_type,
            }) => {
                let mut headers = HeaderMap::new();
                if let Some(ct) = content_type {
                    headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static(ct));
                }
                Ok(UpstreamResponse::from_bytes(status, headers, body))
            }
            Some(MockBehavior::Unreachable(message)) => Err(ProxyError::Unreachable(message)),
            Some(MockBehavior::Hang) => futures::future::pending().await,
            None => Err(ProxyError::Unreachable(format!("no route to {}", url))),
        }
    }
}
