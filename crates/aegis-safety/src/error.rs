//! Safety error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SafetyError {
    #[error("override code does not match; kill switch remains triggered")]
    Unauthorized,

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}

pub type SafetyResult<T> = Result<T, SafetyError>;
