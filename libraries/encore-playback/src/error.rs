//! Error types for playback and synchronization

use crate::types::SessionState;
use encore_core::{ChallengeId, CoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Playback adapter errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Player could not be initialized
    #[error("Player setup failed: {0}")]
    SetupFailed(String),

    /// Track could not be queued
    #[error("Failed to load track {track_id}: {reason}")]
    LoadFailed { track_id: ChallengeId, reason: String },

    /// Play, pause or seek was rejected by the backend
    #[error("{operation} failed: {reason}")]
    TransportFailed {
        operation: &'static str,
        reason: String,
    },

    /// Backend did not answer within the call timeout
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// Player was already set up; not fatal
    #[error("Player already initialized")]
    AlreadyInitialized,
}

impl PlaybackError {
    /// Stable code for reporting
    pub fn code(&self) -> &'static str {
        match self {
            Self::SetupFailed(_) => "SETUP_FAILED",
            Self::LoadFailed { .. } => "LOAD_FAILED",
            Self::TransportFailed { .. } => "TRANSPORT_FAILED",
            Self::Timeout { .. } => "TIMEOUT",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
        }
    }

    pub fn transport(operation: &'static str, reason: impl ToString) -> Self {
        Self::TransportFailed {
            operation,
            reason: reason.to_string(),
        }
    }
}

/// Telemetry read failures
///
/// Never surfaced to callers as an error: the adapter degrades to a sample
/// flagged unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    /// Backend could not report position or active track
    #[error("Playback backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Session state machine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Resolution or sample tagged with a superseded session
    #[error("Stale session generation {received} (current {current})")]
    StaleGeneration { current: u64, received: u64 },

    /// Action not allowed in the current state
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },

    /// No challenge is selected
    #[error("No active playback session")]
    NoActiveSession,

    /// Selected id is not in the catalog
    #[error("Unknown challenge: {0}")]
    UnknownChallenge(ChallengeId),
}

/// Top-level error for the sync engine
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// Engine task is no longer running
    #[error("Sync engine stopped")]
    EngineStopped,
}

impl SyncError {
    /// Stable code for reporting
    pub fn code(&self) -> &'static str {
        match self {
            Self::Playback(e) => e.code(),
            Self::State(StateError::StaleGeneration { .. }) => "STALE_GENERATION",
            Self::State(StateError::InvalidTransition { .. }) => "INVALID_TRANSITION",
            Self::State(StateError::NoActiveSession) => "NO_ACTIVE_SESSION",
            Self::State(StateError::UnknownChallenge(_)) => "UNKNOWN_CHALLENGE",
            Self::Core(_) => "CORE_ERROR",
            Self::EngineStopped => "ENGINE_STOPPED",
        }
    }

    /// Errors the UI should swallow silently
    ///
    /// A superseded session and a repeated player setup are expected during
    /// normal use.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            Self::State(StateError::StaleGeneration { .. })
                | Self::Playback(PlaybackError::AlreadyInitialized)
        )
    }

    /// Convert into a serializable report
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// Error shape shown to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
}

impl From<PlaybackError> for ErrorReport {
    fn from(err: PlaybackError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for sync engine operations
pub type Result<T> = std::result::Result<T, SyncError>;
