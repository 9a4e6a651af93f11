//! Mirror health tracking and failover routing
//!
//! This module provides:
//! - The Mirror entity and its health policy
//! - The MirrorManager that orders and filters the mirrors of one upstream type
//! - The FailoverRouter that walks the ordered candidates for each request

mod entity;
mod health;
mod manager;
mod router;

pub use entity::{normalize_url, Mirror, MirrorStatus};
pub use health::{
    FailureTransition, MirrorHealth, MirrorHealthPolicy, MirrorState, ParseMirrorHealthError,
    MAX_ERROR_LENGTH,
};
pub use manager::{MirrorManager, OFFICIAL_PRIORITY};
pub use router::{AttemptVerdict, FailoverRouter, ForwardPolicy, ForwardRequest, Served};
