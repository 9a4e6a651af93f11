//! Mirror manager for one upstream type
//!
//! The MirrorManager is responsible for:
//! - Keeping the mirrors of one upstream type ordered by priority
//! - Selecting the candidates for a request
//! - Applying the health policy to reported outcomes
//! - Holding the official fallback for the type

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::entity::{Mirror, MirrorStatus};
use super::health::{FailureTransition, MirrorHealth, MirrorHealthPolicy};

/// Priority given to the synthesized official fallback
pub const OFFICIAL_PRIORITY: i32 = 999;

/// Owns the ordered mirrors of one upstream type
pub struct MirrorManager {
    mirror_type: String,
    policy: MirrorHealthPolicy,
    /// Sorted ascending by priority
    mirrors: RwLock<Vec<Arc<Mirror>>>,
    /// Last-resort upstream; failures against it are not recorded so it never goes down
    official: RwLock<Option<Arc<Mirror>>>,
}

impl MirrorManager {
    /// Create an empty manager for `mirror_type`
    pub fn new(mirror_type: impl Into<String>, max_failures: u32) -> Self {
        Self {
            mirror_type: mirror_type.into(),
            policy: MirrorHealthPolicy::new(max_failures),
            mirrors: RwLock::new(Vec::new()),
            official: RwLock::new(None),
        }
    }

    /// Builder-style variant of [`set_official_url`](Self::set_official_url)
    pub fn with_official_url(self, url: &str) -> Self {
        self.set_official_url(url);
        self
    }

    /// Configure the official upstream used as the guaranteed fallback
    pub fn set_official_url(&self, url: &str) {
        let name = format!("{}-official", self.mirror_type);
        let official = Mirror::fallback(url, &name, &self.mirror_type, OFFICIAL_PRIORITY);
        info!(
            "Official {} fallback: {}",
            self.mirror_type,
            official.url()
        );
        *self.official.write() = Some(Arc::new(official));
    }

    pub fn mirror_type(&self) -> &str {
        &self.mirror_type
    }

    pub fn max_failures(&self) -> u32 {
        self.policy.max_failures()
    }

    pub fn official(&self) -> Option<Arc<Mirror>> {
        self.official.read().clone()
    }

    /// Register a mirror and keep the collection sorted by priority.
    ///
    /// Duplicate names or URLs are accepted as distinct entries.
    pub fn add(&self, url: &str, name: &str, priority: i32) -> Arc<Mirror> {
        let mirror = Arc::new(Mirror::new(url, name, &self.mirror_type, priority));

        {
            let mut mirrors = self.mirrors.write();
            mirrors.push(mirror.clone());
            mirrors.sort_by_key(|m| m.priority());
        }

        info!(
            "Added {} mirror: {} ({}) priority={}",
            self.mirror_type,
            name,
            mirror.url(),
            priority
        );

        mirror
    }

    /// Every registered mirror in priority order
    pub fn mirrors(&self) -> Vec<Arc<Mirror>> {
        self.mirrors.read().clone()
    }

    pub fn mirror_count(&self) -> usize {
        self.mirrors.read().len()
    }

    /// Number of registered mirrors currently `Healthy`
    pub fn healthy_count(&self) -> usize {
        self.mirrors
            .read()
            .iter()
            .filter(|m| m.health() == MirrorHealth::Healthy)
            .count()
    }

    /// Candidates for one request, in the order they should be tried.
    ///
    /// `Down` mirrors are left out. The official fallback is appended unless a
    /// candidate already points at the same URL. Candidates are ordered by
    /// health rank, then priority.
    pub fn healthy_mirrors(&self) -> Vec<Arc<Mirror>> {
        let mut candidates: Vec<(u8, i32, Arc<Mirror>)> = self
            .mirrors
            .read()
            .iter()
            .filter_map(|m| {
                let health = m.health();
                (health != MirrorHealth::Down).then(|| (health.rank(), m.priority(), m.clone()))
            })
            .collect();

        if let Some(official) = self.official()
            && !candidates.iter().any(|(_, _, m)| m.url() == official.url())
        {
            candidates.push((official.health().rank(), official.priority(), official));
        }

        candidates.sort_by_key(|(rank, priority, _)| (*rank, *priority));
        candidates.into_iter().map(|(_, _, m)| m).collect()
    }

    /// Record a failed attempt against `mirror`.
    ///
    /// The official fallback is exempt: it stays healthy so that selection
    /// never hands out a `Down` record.
    pub fn mark_failure(&self, mirror: &Mirror, error: &str) {
        if mirror.is_fallback() {
            debug!(
                "Not counting failure for {} fallback {}: {}",
                self.mirror_type,
                mirror.name(),
                error
            );
            return;
        }

        let (transition, failures) = mirror.with_state(|state| {
            let transition = self.policy.record_failure(state, error);
            (transition, state.failure_count)
        });

        debug!(
            "Recorded failure for {} mirror {}: {} (failures: {})",
            self.mirror_type,
            mirror.name(),
            error,
            failures
        );

        if transition == FailureTransition::MarkedDown {
            warn!("Mirror {} marked DOWN", mirror.name());
            metrics::counter!(
                "mirava_mirrors_marked_down_total",
                "mirror_type" => self.mirror_type.clone(),
                "mirror" => mirror.name().to_string()
            )
            .increment(1);
        }
    }

    /// Record a successful attempt against `mirror`
    pub fn mark_success(&self, mirror: &Mirror) {
        mirror.with_state(|state| self.policy.record_success(state));
    }

    /// Reset the first mirror named `name`, falling back to the official
    /// record; returns whether one was found
    pub fn reset(&self, name: &str) -> bool {
        let registered = self
            .mirrors
            .read()
            .iter()
            .find(|m| m.name() == name)
            .cloned();
        let mirror = registered.or_else(|| self.official().filter(|m| m.name() == name));

        match mirror {
            Some(mirror) => {
                mirror.with_state(|state| self.policy.reset(state));
                info!("Reset {} mirror {}", self.mirror_type, name);
                true
            }
            None => false,
        }
    }

    /// Reset every `Down` mirror; returns how many were reset
    pub fn reset_down(&self) -> usize {
        let mut count = 0;
        for mirror in self.mirrors() {
            let revived = mirror.with_state(|state| {
                if state.health == MirrorHealth::Down {
                    self.policy.reset(state);
                    true
                } else {
                    false
                }
            });
            if revived {
                info!("Re-admitted {} mirror {}", self.mirror_type, mirror.name());
                count += 1;
            }
        }
        count
    }

    /// Snapshot of every registered mirror
    pub fn status(&self) -> Vec<MirrorStatus> {
        self.mirrors.read().iter().map(|m| m.status()).collect()
    }
}

impl std::fmt::Debug for MirrorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorManager")
            .field("mirror_type", &self.mirror_type)
            .field("max_failures", &self.policy.max_failures())
            .field("mirrors", &self.mirror_count())
            .finish_non_exhaustive()
    }
}
