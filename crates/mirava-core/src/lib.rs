//! Mirava Core Business Logic
//!
//! This crate provides the core functionality for Mirava,
//! including mirror health tracking, per-type mirror management
//! and the failover loop that routes requests across mirrors.

pub mod config;
pub mod error;
pub mod mirror;
pub mod registry;

pub use config::{default_mirror_types, MirrorConfig, MirrorTypeConfig};
pub use error::CoreError;
pub use mirror::{
    FailoverRouter, ForwardPolicy, ForwardRequest, Mirror, MirrorHealth, MirrorHealthPolicy,
    MirrorManager, MirrorStatus, Served,
};
pub use registry::{spawn_recovery_task, MirrorRegistry};
