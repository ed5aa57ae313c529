//! Conversion error types

use crate::db::repository::RepoError;

/// Errors surfaced by the conversion engine.
///
/// A detected duplicate is deliberately *not* an error: it is a decision
/// point returned as [`super::ConversionOutcome::Aborted`] so the caller
/// can route the user to the existing record or confirm a merge.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Enquiry {0} not found")]
    NotFound(i64),

    #[error("Enquiry {0} is already converted")]
    AlreadyConverted(i64),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("A team member must be selected before conversion")]
    AssignmentRequired,

    /// The losing side of a conversion race could not locate the winner
    /// (read-after-write visibility gap). Transient; the enquiry stays
    /// unconverted and the attempt is safe to retry or repair.
    #[error("Conversion conflict not resolved: {0}")]
    ConflictUnresolved(String),

    #[error("Storage unavailable: {0}")]
    Transport(String),
}

impl ConversionError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConflictUnresolved(_) | Self::Transport(_))
    }
}

impl From<RepoError> for ConversionError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Validation(msg) => ConversionError::Validation(msg),
            // Duplicate is intercepted at the one statement where it can
            // legitimately occur (the client insert); anything reaching
            // this blanket conversion is a store-level failure.
            other => ConversionError::Transport(other.to_string()),
        }
    }
}
