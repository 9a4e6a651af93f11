//! Application state

use mirava_core::{FailoverRouter, MirrorRegistry};
use std::sync::Arc;

/// Prometheus render handle served at `/metrics`
pub type MetricsHandle = metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<MirrorRegistry>,
    pub router: Arc<FailoverRouter>,
}

impl AppState {
    pub fn new(registry: Arc<MirrorRegistry>, router: Arc<FailoverRouter>) -> Self {
        Self { registry, router }
    }
}
