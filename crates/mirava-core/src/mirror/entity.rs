//! The mirror entity

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::health::{MirrorHealth, MirrorState};

/// One upstream endpoint plus its observed health.
///
/// Identity fields are immutable; the health record sits behind its own lock
/// so concurrent requests can report outcomes for the same mirror safely.
#[derive(Debug)]
pub struct Mirror {
    url: String,
    name: String,
    mirror_type: String,
    priority: i32,
    /// Official fallback: always offered, never takes failures
    fallback: bool,
    last_check: DateTime<Utc>,
    state: Mutex<MirrorState>,
}

impl Mirror {
    pub(crate) fn new(url: &str, name: &str, mirror_type: &str, priority: i32) -> Self {
        Self {
            url: normalize_url(url),
            name: name.to_string(),
            mirror_type: mirror_type.to_string(),
            priority,
            fallback: false,
            last_check: Utc::now(),
            state: Mutex::new(MirrorState::default()),
        }
    }

    /// The official upstream of a type, offered after every mirror
    pub(crate) fn fallback(url: &str, name: &str, mirror_type: &str, priority: i32) -> Self {
        Self {
            fallback: true,
            ..Self::new(url, name, mirror_type, priority)
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mirror_type(&self) -> &str {
        &self.mirror_type
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn last_check(&self) -> DateTime<Utc> {
        self.last_check
    }

    pub fn health(&self) -> MirrorHealth {
        self.state.lock().health
    }

    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Copy of the current health record
    pub fn state(&self) -> MirrorState {
        self.state.lock().clone()
    }

    /// Run `f` with exclusive access to the health record
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut MirrorState) -> R) -> R {
        let mut state = self.state.lock();
        f(&mut state)
    }

    /// Serializable snapshot for diagnostics
    pub fn status(&self) -> MirrorStatus {
        let state = self.state();
        MirrorStatus {
            name: self.name.clone(),
            url: self.url.clone(),
            mirror_type: self.mirror_type.clone(),
            priority: self.priority,
            health: state.health,
            failure_count: state.failure_count,
            last_error: state.last_error,
            last_check: self.last_check,
        }
    }
}

/// Point-in-time view of a mirror
#[derive(Debug, Clone, Serialize)]
pub struct MirrorStatus {
    pub name: String,
    pub url: String,
    pub mirror_type: String,
    pub priority: i32,
    pub health: MirrorHealth,
    pub failure_count: u32,
    pub last_error: Option<String>,
    pub last_check: DateTime<Utc>,
}

/// Trim whitespace and trailing slashes from a base URL
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
