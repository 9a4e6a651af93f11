//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown mirror type: {0}")]
    UnknownMirrorType(String),

    #[error("Mirror not found: {0}")]
    MirrorNotFound(String),

    #[error("All {mirror_type} mirrors failed after {attempts} attempts")]
    AllMirrorsExhausted { mirror_type: String, attempts: usize },
}
