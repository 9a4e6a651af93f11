//! Request/Response DTOs

use std::collections::BTreeMap;

use mirava_core::{MirrorHealth, MirrorManager};
use serde::{Deserialize, Serialize};

// ==================== Status Types ====================

/// Known endpoint paths advertised by the status route
#[derive(Serialize)]
pub struct EndpointsResponse {
    pub docker_v2: &'static str,
    pub pypi_simple: &'static str,
    pub health: &'static str,
    pub metrics: &'static str,
}

/// GET / response
#[derive(Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub mirror_types: Vec<String>,
    pub total_mirrors: usize,
    pub endpoints: EndpointsResponse,
}

// ==================== Health Types ====================

/// One mirror in the health report
#[derive(Serialize)]
pub struct MirrorHealthEntry {
    pub name: String,
    pub url: String,
    pub health: MirrorHealth,
    pub failures: u32,
}

/// Health of every mirror of one upstream type
#[derive(Serialize)]
pub struct TypeHealthResponse {
    pub total: usize,
    pub healthy: usize,
    pub mirrors: Vec<MirrorHealthEntry>,
}

impl From<&MirrorManager> for TypeHealthResponse {
    fn from(manager: &MirrorManager) -> Self {
        let mirrors: Vec<MirrorHealthEntry> = manager
            .status()
            .into_iter()
            .map(|s| MirrorHealthEntry {
                name: s.name,
                url: s.url,
                health: s.health,
                failures: s.failure_count,
            })
            .collect();

        Self {
            total: mirrors.len(),
            healthy: mirrors
                .iter()
                .filter(|m| m.health == MirrorHealth::Healthy)
                .count(),
            mirrors,
        }
    }
}

/// GET /health response: a timestamp plus one entry per upstream type
#[derive(Serialize)]
pub struct HealthReportResponse {
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    #[serde(flatten)]
    pub types: BTreeMap<String, TypeHealthResponse>,
}

/// GET /healthz response
#[derive(Serialize)]
pub struct LivenessResponse {
    pub status: String,
    pub version: String,
}

// ==================== Mirror Management Types ====================

/// POST /mirrors/{mirror_type} query parameters
#[derive(Deserialize)]
pub struct AddMirrorQuery {
    pub url: String,
    pub name: String,
    #[serde(default = "mirava_core::config::default_priority")]
    pub priority: i32,
}

/// POST /mirrors/{mirror_type} response
#[derive(Serialize)]
pub struct AddMirrorResponse {
    pub status: &'static str,
    #[serde(rename = "type")]
    pub mirror_type: String,
    pub name: String,
    pub url: String,
}

/// POST /mirrors/{mirror_type}/{name}/reset response
#[derive(Serialize)]
pub struct ResetMirrorResponse {
    pub status: &'static str,
    #[serde(rename = "type")]
    pub mirror_type: String,
    pub name: String,
}
