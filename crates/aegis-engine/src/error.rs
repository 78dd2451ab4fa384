//! Engine-level errors.

use aegis_core::RejectReason;
use aegis_safety::SafetyError;
use thiserror::Error;

/// Everything an engine operation can fail with.
///
/// Rejections carry the full taxonomy so callers can branch on
/// [`RejectReason::code`] or [`RejectReason::kind`] without string matching.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request was refused by validation, the venue, or connectivity.
    #[error(transparent)]
    Rejected(#[from] RejectReason),

    /// Kill switch rearm refused, the override code did not match.
    #[error("override code does not match, kill switch remains triggered")]
    Unauthorized,

    /// Configuration could not be loaded or failed its sanity checks.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// The rejection reason, when this error is one.
    #[must_use]
    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

impl From<SafetyError> for EngineError {
    fn from(err: SafetyError) -> Self {
        match err {
            SafetyError::Unauthorized => Self::Unauthorized,
            SafetyError::InvalidPolicy(detail) => Self::Config(detail),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
