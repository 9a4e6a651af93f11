//! Mirror health states and the policy that moves between them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Longest error message kept on a mirror
pub const MAX_ERROR_LENGTH: usize = 100;

/// Error type for parsing a health label
#[derive(Debug, Clone)]
pub struct ParseMirrorHealthError(String);

impl fmt::Display for ParseMirrorHealthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid mirror health: {}", self.0)
    }
}

impl std::error::Error for ParseMirrorHealthError {}

/// Eligibility classification of a mirror
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MirrorHealth {
    /// Eligible and preferred
    #[default]
    Healthy,
    /// Eligible, ordered after healthy mirrors. No transition leads here yet.
    Degraded,
    /// Excluded from selection until reset
    Down,
}

impl MirrorHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorHealth::Healthy => "healthy",
            MirrorHealth::Degraded => "degraded",
            MirrorHealth::Down => "down",
        }
    }

    /// Selection rank, lower is tried first
    pub fn rank(&self) -> u8 {
        match self {
            MirrorHealth::Healthy => 0,
            MirrorHealth::Degraded => 1,
            MirrorHealth::Down => 2,
        }
    }
}

impl fmt::Display for MirrorHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MirrorHealth {
    type Err = ParseMirrorHealthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "healthy" => Ok(MirrorHealth::Healthy),
            "degraded" => Ok(MirrorHealth::Degraded),
            "down" => Ok(MirrorHealth::Down),
            _ => Err(ParseMirrorHealthError(s.to_string())),
        }
    }
}

/// Mutable health record of one mirror
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorState {
    pub health: MirrorHealth,
    pub failure_count: u32,
    pub last_error: Option<String>,
}

/// Effect of a recorded failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTransition {
    /// Counter incremented, health unchanged
    Counted,
    /// This failure crossed the threshold
    MarkedDown,
}

/// Pure transition logic for [`MirrorState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorHealthPolicy {
    max_failures: u32,
}

impl MirrorHealthPolicy {
    pub const DEFAULT_MAX_FAILURES: u32 = 3;

    /// Create a policy; a threshold of zero is raised to one
    pub fn new(max_failures: u32) -> Self {
        if max_failures == 0 {
            warn!("max_failures 0 is below minimum 1, using minimum");
            return Self { max_failures: 1 };
        }
        Self { max_failures }
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    pub fn record_failure(&self, state: &mut MirrorState, error: &str) -> FailureTransition {
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_error = Some(truncate(error, MAX_ERROR_LENGTH));

        if state.failure_count >= self.max_failures && state.health != MirrorHealth::Down {
            state.health = MirrorHealth::Down;
            FailureTransition::MarkedDown
        } else {
            FailureTransition::Counted
        }
    }

    /// A success clears the counter but does not lift a mirror out of `Down`
    pub fn record_success(&self, state: &mut MirrorState) {
        state.failure_count = 0;
    }

    pub fn reset(&self, state: &mut MirrorState) {
        state.failure_count = 0;
        state.health = MirrorHealth::Healthy;
        state.last_error = None;
    }
}

impl Default for MirrorHealthPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_FAILURES)
    }
}

fn truncate(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}
