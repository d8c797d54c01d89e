//! Playback backend abstraction
//!
//! A backend is the platform audio service: it owns the actual queue and
//! audio output. Implementations are expected to be cheap to call from
//! several tasks; the adapter serializes calls itself.

use crate::types::{BackendProgress, PlayerOptions, Track};
use async_trait::async_trait;
use encore_core::ChallengeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors reported by a backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Player already initialized")]
    AlreadyInitialized,

    #[error("Player not initialized")]
    NotInitialized,

    /// Backend service cannot be reached
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the request
    #[error("{0}")]
    Rejected(String),
}

/// Notifications pushed by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackendEvent {
    /// Track played to its natural end
    TrackEnded { track_id: ChallengeId },

    /// Active queue item changed
    ActiveTrackChanged { track_id: Option<ChallengeId> },

    /// Backend started or stopped producing audio on its own
    PlaybackStateChanged { playing: bool },
}

/// Platform audio service
#[async_trait]
pub trait PlaybackBackend: Send + Sync + 'static {
    /// Initialize the player
    async fn setup(&self, options: &PlayerOptions) -> Result<(), BackendError>;

    /// Stop playback and clear the queue
    async fn reset(&self) -> Result<(), BackendError>;

    /// Append a track to the queue
    async fn add(&self, track: &Track) -> Result<(), BackendError>;

    async fn play(&self) -> Result<(), BackendError>;

    async fn pause(&self) -> Result<(), BackendError>;

    /// Move the play head of the active track
    async fn seek_to(&self, position_seconds: f64) -> Result<(), BackendError>;

    /// Current position and duration of the active track
    async fn progress(&self) -> Result<BackendProgress, BackendError>;

    /// Id of the active queue item, if any
    async fn active_track(&self) -> Result<Option<ChallengeId>, BackendError>;

    /// Subscribe to backend notifications
    ///
    /// Backends without push notifications return `None`; the engine then
    /// relies on polling alone.
    fn subscribe(&self) -> Option<broadcast::Receiver<BackendEvent>> {
        None
    }
}
