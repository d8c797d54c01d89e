//! Core error types for Encore
use crate::types::ChallengeId;
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for catalog and progress operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Challenge not present in the catalog
    #[error("Challenge not found: {0}")]
    ChallengeNotFound(ChallengeId),

    /// Two catalog entries share an id
    #[error("Duplicate challenge id: {0}")]
    DuplicateChallenge(ChallengeId),

    /// Catalog entry with a non-positive or non-finite duration
    #[error("Invalid duration for challenge {id}: {duration_seconds}")]
    InvalidDuration {
        id: ChallengeId,
        duration_seconds: f64,
    },

    /// Catalog could not be parsed
    #[error("Invalid catalog JSON: {0}")]
    Serialization(String),

    /// Progress store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Create a not found error
    pub fn not_found(id: impl Into<ChallengeId>) -> Self {
        Self::ChallengeNotFound(id.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
