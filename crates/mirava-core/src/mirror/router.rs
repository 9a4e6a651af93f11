//! Failover routing across the mirrors of one upstream type
//!
//! A request is tried against each candidate from
//! [`MirrorManager::healthy_mirrors`] strictly in order. Every completed
//! attempt is classified and reported back to the manager; the first
//! deliverable response ends the loop.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use mirava_proxy::{UpstreamClient, UpstreamRequest, UpstreamResponse};
use tracing::{debug, info, warn};

use super::entity::Mirror;
use super::manager::MirrorManager;
use crate::error::CoreError;

/// Which upstream statuses end the failover loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardPolicy {
    /// Container registry traffic: every status below 500 is handed to the caller
    Registry,
    /// Package index traffic: only 200 is handed to the caller
    PackageIndex,
}

/// Classification of one completed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptVerdict {
    /// Hand the response to the caller
    Deliver,
    /// Count a failure and move on
    ServerError,
    /// Move on without counting a failure
    Skip,
}

impl ForwardPolicy {
    pub fn classify(&self, status: StatusCode) -> AttemptVerdict {
        if status.is_server_error() {
            return AttemptVerdict::ServerError;
        }
        match self {
            ForwardPolicy::Registry => AttemptVerdict::Deliver,
            ForwardPolicy::PackageIndex if status == StatusCode::OK => AttemptVerdict::Deliver,
            ForwardPolicy::PackageIndex => AttemptVerdict::Skip,
        }
    }
}

/// A request as it will be replayed against each mirror
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    /// Path appended to the mirror base URL, starting with `/`
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl ForwardRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query.filter(|q| !q.is_empty());
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Option<Bytes>) -> Self {
        self.body = body;
        self
    }

    /// Absolute URL of this request on `mirror`
    pub fn url_for(&self, mirror: &Mirror) -> String {
        match &self.query {
            Some(query) => format!("{}{}?{}", mirror.url(), self.path, query),
            None => format!("{}{}", mirror.url(), self.path),
        }
    }

    fn to_upstream(&self, mirror: &Mirror) -> UpstreamRequest {
        UpstreamRequest {
            method: self.method.clone(),
            url: self.url_for(mirror),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// The response that ended the loop and the mirror that produced it
#[derive(Debug)]
pub struct Served {
    pub mirror: Arc<Mirror>,
    pub response: UpstreamResponse,
}

/// Executes requests with ordered failover
pub struct FailoverRouter {
    client: Arc<dyn UpstreamClient>,
}

impl FailoverRouter {
    pub fn new(client: Arc<dyn UpstreamClient>) -> Self {
        Self { client }
    }

    /// Try `request` on each candidate of `manager` until one delivers.
    ///
    /// Health is updated only after an attempt completes. If the caller drops
    /// the returned future mid-attempt, that attempt leaves no trace on the
    /// mirror.
    pub async fn execute(
        &self,
        manager: &MirrorManager,
        request: &ForwardRequest,
        policy: ForwardPolicy,
    ) -> Result<Served, CoreError> {
        let candidates = manager.healthy_mirrors();
        let mirror_type = manager.mirror_type();
        let mut attempts = 0;

        for mirror in candidates {
            attempts += 1;
            info!("[{}] {} {}", mirror.name(), request.method, request.path);

            let result = self.client.send(request.to_upstream(&mirror)).await;

            match result {
                Ok(response) => {
                    let status = response.status;
                    match policy.classify(status) {
                        AttemptVerdict::Deliver => {
                            if status == StatusCode::UNAUTHORIZED {
                                info!("[{}] Auth required", mirror.name());
                            }
                            if status.is_success() {
                                manager.mark_success(&mirror);
                            }
                            record_attempt(mirror_type, &mirror, "delivered");
                            info!("[{}] Success: {}", mirror.name(), status.as_u16());
                            return Ok(Served { mirror, response });
                        }
                        AttemptVerdict::ServerError => {
                            warn!("[{}] Server error: {}", mirror.name(), status.as_u16());
                            manager.mark_failure(&mirror, &format!("HTTP {}", status.as_u16()));
                            record_attempt(mirror_type, &mirror, "server_error");
                        }
                        AttemptVerdict::Skip => {
                            debug!(
                                "[{}] Not served ({}), trying next mirror",
                                mirror.name(),
                                status.as_u16()
                            );
                            record_attempt(mirror_type, &mirror, "skipped");
                        }
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!("[{}] Error: {}", mirror.name(), message);
                    manager.mark_failure(&mirror, &message);
                    record_attempt(mirror_type, &mirror, "transport_error");
                }
            }
        }

        metrics::counter!(
            "mirava_requests_exhausted_total",
            "mirror_type" => mirror_type.to_string()
        )
        .increment(1);

        Err(CoreError::AllMirrorsExhausted {
            mirror_type: mirror_type.to_string(),
            attempts,
        })
    }
}

fn record_attempt(mirror_type: &str, mirror: &Mirror, outcome: &'static str) {
    metrics::counter!(
        "mirava_upstream_attempts_total",
        "mirror_type" => mirror_type.to_string(),
        "mirror" => mirror.name().to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::health::MirrorHealth;
    use mirava_proxy::{MockBehavior, MockUpstreamClient};
    use std::time::Duration;

    fn docker_manager() -> MirrorManager {
        let manager = MirrorManager::new("docker", 3);
        manager.add("https://a", "a", 0);
        manager.add("https://b", "b", 1);
        manager
    }

    fn router(client: &Arc<MockUpstreamClient>) -> FailoverRouter {
        FailoverRouter::new(client.clone())
    }

    #[test]
    fn test_classify() {
        use AttemptVerdict::*;

        let registry = ForwardPolicy::Registry;
        assert_eq!(registry.classify(StatusCode::OK), Deliver);
        assert_eq!(registry.classify(StatusCode::UNAUTHORIZED), Deliver);
        assert_eq!(registry.classify(StatusCode::NOT_FOUND), Deliver);
        assert_eq!(registry.classify(StatusCode::TEMPORARY_REDIRECT), Deliver);
        assert_eq!(registry.classify(StatusCode::BAD_GATEWAY), ServerError);

        let index = ForwardPolicy::PackageIndex;
        assert_eq!(index.classify(StatusCode::OK), Deliver);
        assert_eq!(index.classify(StatusCode::NOT_FOUND), Skip);
        assert_eq!(index.classify(StatusCode::NO_CONTENT), Skip);
        assert_eq!(index.classify(StatusCode::SERVICE_UNAVAILABLE), ServerError);
    }

    #[test]
    fn test_url_for_appends_query() {
        let manager = docker_manager();
        let mirror = &manager.mirrors()[0];

        let plain = ForwardRequest::new(Method::GET, "/v2/");
        assert_eq!(plain.url_for(mirror), "https://a/v2/");

        let with_query = ForwardRequest::new(Method::GET, "/v2/library/alpine/tags/list")
            .with_query(Some("n=10".to_string()));
        assert_eq!(
            with_query.url_for(mirror),
            "https://a/v2/library/alpine/tags/list?n=10"
        );

        let empty_query = ForwardRequest::new(Method::GET, "/v2/").with_query(Some(String::new()));
        assert_eq!(empty_query.url_for(mirror), "https://a/v2/");
    }

    #[tokio::test]
    async fn test_server_error_fails_over_to_next_mirror() {
        let client = Arc::new(
            MockUpstreamClient::new()
                .on("https://a", MockBehavior::status(503))
                .on("https://b", MockBehavior::body(200, "{}", "application/json")),
        );
        let manager = docker_manager();

        let served = router(&client)
            .execute(
                &manager,
                &ForwardRequest::new(Method::GET, "/v2/"),
                ForwardPolicy::Registry,
            )
            .await
            .unwrap();

        assert_eq!(served.mirror.name(), "b");
        assert_eq!(served.response.status, StatusCode::OK);
        assert_eq!(
            client.requested_urls(),
            vec!["https://a/v2/", "https://b/v2/"]
        );

        let a = &manager.mirrors()[0];
        assert_eq!(a.failure_count(), 1);
        assert_eq!(a.last_error().as_deref(), Some("HTTP 503"));
    }

    #[tokio::test]
    async fn test_client_errors_are_delivered_without_failure() {
        for status in [401, 404] {
            let client =
                Arc::new(MockUpstreamClient::new().on("https://a", MockBehavior::status(status)));
            let manager = docker_manager();

            let served = router(&client)
                .execute(
                    &manager,
                    &ForwardRequest::new(Method::GET, "/v2/"),
                    ForwardPolicy::Registry,
                )
                .await
                .unwrap();

            assert_eq!(served.mirror.name(), "a");
            assert_eq!(served.response.status.as_u16(), status);
            assert_eq!(served.mirror.failure_count(), 0);
            assert_eq!(client.requests().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_success_clears_previous_failures() {
        let client = Arc::new(
            MockUpstreamClient::new()
                .on_sequence(
                    "https://a",
                    vec![MockBehavior::status(500), MockBehavior::status(200)],
                )
                .on("https://b", MockBehavior::status(200)),
        );
        let manager = docker_manager();
        let router = router(&client);
        let request = ForwardRequest::new(Method::GET, "/v2/");

        router
            .execute(&manager, &request, ForwardPolicy::Registry)
            .await
            .unwrap();
        assert_eq!(manager.mirrors()[0].failure_count(), 1);

        let served = router
            .execute(&manager, &request, ForwardPolicy::Registry)
            .await
            .unwrap();
        assert_eq!(served.mirror.name(), "a");
        assert_eq!(manager.mirrors()[0].failure_count(), 0);
    }

    #[tokio::test]
    async fn test_package_index_skips_non_200_without_failure() {
        let client = Arc::new(
            MockUpstreamClient::new()
                .on("https://a", MockBehavior::status(404))
                .on("https://b", MockBehavior::body(200, "<html/>", "text/html")),
        );
        let manager = docker_manager();

        let served = router(&client)
            .execute(
                &manager,
                &ForwardRequest::new(Method::GET, "/requests/"),
                ForwardPolicy::PackageIndex,
            )
            .await
            .unwrap();

        assert_eq!(served.mirror.name(), "b");
        assert_eq!(manager.mirrors()[0].failure_count(), 0);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts() {
        let client = Arc::new(
            MockUpstreamClient::new()
                .on("https://a", MockBehavior::unreachable("connection refused"))
                .on("https://b", MockBehavior::status(502)),
        );
        let manager = docker_manager();

        let err = router(&client)
            .execute(
                &manager,
                &ForwardRequest::new(Method::GET, "/v2/"),
                ForwardPolicy::Registry,
            )
            .await
            .unwrap_err();

        match err {
            CoreError::AllMirrorsExhausted {
                mirror_type,
                attempts,
            } => {
                assert_eq!(mirror_type, "docker");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        let mirrors = manager.mirrors();
        assert!(
            mirrors[0]
                .last_error()
                .unwrap()
                .contains("connection refused")
        );
        assert_eq!(mirrors[1].last_error().as_deref(), Some("HTTP 502"));
    }

    #[tokio::test]
    async fn test_empty_candidate_list_is_exhausted() {
        let client = Arc::new(MockUpstreamClient::new());
        let manager = MirrorManager::new("docker", 3);

        let err = router(&client)
            .execute(
                &manager,
                &ForwardRequest::new(Method::GET, "/v2/"),
                ForwardPolicy::Registry,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::AllMirrorsExhausted { attempts: 0, .. }
        ));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_transport_errors_take_mirror_down() {
        let client = Arc::new(
            MockUpstreamClient::new()
                .on("https://a", MockBehavior::unreachable("connect timeout"))
                .on("https://b", MockBehavior::status(200)),
        );
        let manager = docker_manager();
        let router = router(&client);
        let request = ForwardRequest::new(Method::GET, "/v2/");

        for _ in 0..2 {
            router
                .execute(&manager, &request, ForwardPolicy::Registry)
                .await
                .unwrap();
            let healthy: Vec<_> = manager
                .healthy_mirrors()
                .iter()
                .map(|m| m.name().to_string())
                .collect();
            assert_eq!(healthy, vec!["a", "b"]);
        }

        router
            .execute(&manager, &request, ForwardPolicy::Registry)
            .await
            .unwrap();

        let healthy = manager.healthy_mirrors();
        assert_eq!(healthy.len(), 1);
        assert_eq!(healthy[0].name(), "b");
        assert_eq!(manager.mirrors()[0].health(), MirrorHealth::Down);

        // A fourth request goes straight to b
        router
            .execute(&manager, &request, ForwardPolicy::Registry)
            .await
            .unwrap();
        assert_eq!(client.requests().len(), 7);
        assert_eq!(client.requested_urls().last().unwrap(), "https://b/v2/");
    }

    #[tokio::test]
    async fn test_cancelled_attempt_records_nothing() {
        let client = Arc::new(MockUpstreamClient::new().on("https://a", MockBehavior::Hang));
        let manager = docker_manager();
        let request = ForwardRequest::new(Method::GET, "/v2/");
        let router = router(&client);

        let result = tokio::time::timeout(
            Duration::from_millis(20),
            router.execute(&manager, &request, ForwardPolicy::Registry),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(client.requests().len(), 1);
        for mirror in manager.mirrors() {
            assert_eq!(mirror.failure_count(), 0);
            assert!(mirror.last_error().is_none());
        }
    }

    #[tokio::test]
    async fn test_forwards_method_headers_and_body() {
        let client = Arc::new(MockUpstreamClient::new().on("https://a", MockBehavior::status(202)));
        let manager = docker_manager();
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer t".parse().unwrap());

        let request = ForwardRequest::new(Method::POST, "/v2/library/alpine/blobs/uploads/")
            .with_headers(headers)
            .with_body(Some(Bytes::from_static(b"payload")));

        router(&client)
            .execute(&manager, &request, ForwardPolicy::Registry)
            .await
            .unwrap();

        let sent = &client.requests()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.headers.get("authorization").unwrap(), "Bearer t");
        assert_eq!(sent.body.as_deref(), Some(&b"payload"[..]));
    }
}
