//! Core types for playback synchronization

use encore_core::{Challenge, ChallengeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifecycle of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No challenge selected
    #[default]
    Idle,
    /// Track is being queued
    Loading,
    /// Track queued, not playing
    Ready,
    /// Audio playing
    Playing,
    /// Audio paused
    Paused,
    /// Challenge reached 100% in this session
    Completed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single active playback session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub active_challenge_id: Option<ChallengeId>,
    /// Generation the session was started with
    pub generation: u64,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    pub is_playing: bool,
    pub state: SessionState,
}

/// Remote-control capabilities exposed by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Play,
    Pause,
    SkipToNext,
    SkipToPrevious,
    SeekTo,
}

/// What the player does when the app is killed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppKilledPlaybackBehavior {
    ContinuePlayback,
    PausePlayback,
    StopPlaybackAndRemoveNotification,
}

/// Queue repeat behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    Off,
    Track,
    Queue,
}

/// Options passed to the backend at setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerOptions {
    pub capabilities: Vec<Capability>,
    pub notification_capabilities: Vec<Capability>,
    pub app_killed_behavior: AppKilledPlaybackBehavior,
    /// Audio cache budget in KiB
    pub max_cache_size_kb: u32,
    pub repeat_mode: RepeatMode,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            capabilities: vec![
                Capability::Play,
                Capability::Pause,
                Capability::SkipToNext,
                Capability::SkipToPrevious,
                Capability::SeekTo,
            ],
            notification_capabilities: vec![
                Capability::Play,
                Capability::Pause,
                Capability::SkipToNext,
                Capability::SkipToPrevious,
            ],
            app_killed_behavior: AppKilledPlaybackBehavior::StopPlaybackAndRemoveNotification,
            max_cache_size_kb: 1024 * 10,
            repeat_mode: RepeatMode::Queue,
        }
    }
}

/// A queued audio item
///
/// The track id is the challenge id it was created from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: ChallengeId,
    pub url: String,
    pub title: String,
    pub artist: String,
    pub duration_seconds: Option<f64>,
}

impl From<&Challenge> for Track {
    fn from(challenge: &Challenge) -> Self {
        Self {
            id: challenge.id.clone(),
            url: challenge.url.clone(),
            title: challenge.title.clone(),
            artist: challenge.artist.clone(),
            duration_seconds: Some(challenge.duration_seconds),
        }
    }
}

/// Raw position report from a backend
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BackendProgress {
    pub position_seconds: f64,
    /// Zero when the backend does not know the duration yet
    pub duration_seconds: f64,
}

/// One telemetry poll as seen by the sync layer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetrySample {
    /// Track the backend reports as active
    pub track_id: Option<ChallengeId>,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    /// False when the backend could not be read
    pub available: bool,
}

/// Telemetry tagged with the session it was requested for
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedTelemetry {
    pub generation: u64,
    pub sample: TelemetrySample,
}

/// Sync engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Telemetry poll period while playing
    pub telemetry_interval_ms: u64,
    /// Upper bound for any single backend call
    pub call_timeout_ms: u64,
    /// Capacity of the event broadcast channel
    pub event_buffer: usize,
    pub player: PlayerOptions,
}

impl EngineConfig {
    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms.max(1))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            telemetry_interval_ms: 1000,
            call_timeout_ms: 5000,
            event_buffer: 64,
            player: PlayerOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::Difficulty;

    #[test]
    fn player_options_defaults() {
        let options = PlayerOptions::default();
        assert_eq!(options.max_cache_size_kb, 10240);
        assert_eq!(options.repeat_mode, RepeatMode::Queue);
        assert!(options.capabilities.contains(&Capability::SeekTo));
        assert!(!options.notification_capabilities.contains(&Capability::SeekTo));
    }

    #[test]
    fn track_from_challenge_keeps_id_and_duration() {
        let challenge = Challenge::new("c1", "Song", "Artist", Difficulty::Easy, 180.0, 50)
            .with_url("https://cdn.example.com/c1.mp3");
        let track = Track::from(&challenge);
        assert_eq!(track.id, challenge.id);
        assert_eq!(track.url, "https://cdn.example.com/c1.mp3");
        assert_eq!(track.duration_seconds, Some(180.0));
    }

    #[test]
    fn engine_config_partial_deserialize() {
        let config: EngineConfig = serde_json::from_str(r#"{"call_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.call_timeout(), Duration::from_millis(250));
        assert_eq!(config.telemetry_interval_ms, 1000);
    }
}
