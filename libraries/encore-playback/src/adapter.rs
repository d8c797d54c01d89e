//! Playback adapter
//!
//! Uniform, timeout-bounded operations over a [`PlaybackBackend`]. Mutating
//! calls are serialized through an async mutex so a queue replacement is
//! never interleaved with another one.

use crate::backend::{BackendError, PlaybackBackend};
use crate::error::{PlaybackError, TelemetryError};
use crate::types::{PlayerOptions, TelemetrySample, Track};
use encore_core::ChallengeId;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

type Result<T> = std::result::Result<T, PlaybackError>;

#[derive(Debug, Default)]
struct AdapterState {
    initialized: bool,
    is_playing: bool,
    queued: Option<ChallengeId>,
    last_known_duration: f64,
}

/// Wrapper around a backend enforcing call timeouts and queue discipline
pub struct PlaybackAdapter<B> {
    backend: B,
    call_timeout: Duration,
    calls: tokio::sync::Mutex<()>,
    state: Mutex<AdapterState>,
}

impl<B: PlaybackBackend> PlaybackAdapter<B> {
    pub fn new(backend: B, call_timeout: Duration) -> Self {
        Self {
            backend,
            call_timeout,
            calls: tokio::sync::Mutex::new(()),
            state: Mutex::new(AdapterState::default()),
        }
    }

    /// Access the wrapped backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    /// Last play/pause outcome known to the adapter
    pub fn is_playing(&self) -> bool {
        self.state().is_playing
    }

    /// Track currently in the backend queue, as far as the adapter knows
    pub fn queued_track(&self) -> Option<ChallengeId> {
        self.state().queued.clone()
    }

    pub(crate) fn set_playing(&self, playing: bool) {
        self.state().is_playing = playing;
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<crate::backend::BackendEvent>> {
        self.backend.subscribe()
    }

    /// Initialize the player with the given options
    ///
    /// A second call returns [`PlaybackError::AlreadyInitialized`], which
    /// callers should treat as success.
    pub async fn setup(&self, options: &PlayerOptions) -> Result<()> {
        let _guard = self.calls.lock().await;

        if self.state().initialized {
            debug!("Player setup skipped, already initialized");
            return Err(PlaybackError::AlreadyInitialized);
        }

        match self.call("setup", self.backend.setup(options)).await? {
            Ok(()) => {
                self.state().initialized = true;
                info!(
                    cache_kb = options.max_cache_size_kb,
                    repeat = ?options.repeat_mode,
                    "Player setup complete"
                );
                Ok(())
            }
            Err(BackendError::AlreadyInitialized) => {
                self.state().initialized = true;
                Err(PlaybackError::AlreadyInitialized)
            }
            Err(e) => {
                error!("Player setup failed: {}", e);
                Err(PlaybackError::SetupFailed(e.to_string()))
            }
        }
    }

    /// Stop playback and clear the queue
    ///
    /// Never fails: backend errors and timeouts are logged and swallowed.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.calls.lock().await;
        self.reset_locked().await;
        Ok(())
    }

    /// Queue exactly one track, replacing whatever was queued
    pub async fn load(&self, track: &Track) -> Result<()> {
        let _guard = self.calls.lock().await;
        if self.state().queued.is_some() {
            self.reset_locked().await;
        }
        self.add_locked(track).await
    }

    /// Reset and load in one step, unless the session was superseded
    ///
    /// `latest` is checked after acquiring the call lock, so a superseded
    /// selection never touches the backend. Returns `Ok(false)` when skipped.
    pub async fn load_for_session(
        &self,
        track: &Track,
        generation: u64,
        latest: &AtomicU64,
    ) -> Result<bool> {
        let _guard = self.calls.lock().await;

        let current = latest.load(Ordering::SeqCst);
        if current != generation {
            debug!(
                track_id = %track.id,
                generation,
                current,
                "Skipping load for superseded session"
            );
            return Ok(false);
        }

        self.reset_locked().await;
        self.add_locked(track).await?;
        Ok(true)
    }

    pub async fn play(&self) -> Result<()> {
        let _guard = self.calls.lock().await;
        match self.call("play", self.backend.play()).await {
            Ok(Ok(())) => {
                self.set_playing(true);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_playing(false);
                warn!("Play rejected by backend: {}", e);
                Err(PlaybackError::transport("play", e))
            }
            Err(e) => {
                self.set_playing(false);
                Err(e)
            }
        }
    }

    pub async fn pause(&self) -> Result<()> {
        let _guard = self.calls.lock().await;
        match self.call("pause", self.backend.pause()).await? {
            Ok(()) => {
                self.set_playing(false);
                Ok(())
            }
            Err(e) => {
                warn!("Pause rejected by backend: {}", e);
                Err(PlaybackError::transport("pause", e))
            }
        }
    }

    /// Seek within the active track, returning the clamped target
    ///
    /// Targets are clamped to `[0, duration]` using the last known duration.
    pub async fn seek(&self, position_seconds: f64) -> Result<f64> {
        let target = self.clamp_seek(position_seconds);

        let _guard = self.calls.lock().await;
        match self.call("seek", self.backend.seek_to(target)).await? {
            Ok(()) => {
                debug!(requested = position_seconds, target, "Seeked");
                Ok(target)
            }
            Err(e) => {
                warn!("Seek rejected by backend: {}", e);
                Err(PlaybackError::transport("seek", e))
            }
        }
    }

    /// Read position, duration and active track
    ///
    /// Degrades instead of failing: when the backend cannot be read the
    /// sample is flagged unavailable with position 0 and the last known
    /// duration.
    pub async fn get_progress(&self) -> TelemetrySample {
        match self.try_get_progress().await {
            Ok(sample) => sample,
            Err(e) => {
                warn!("{}", e);
                TelemetrySample {
                    track_id: None,
                    position_seconds: 0.0,
                    duration_seconds: self.state().last_known_duration,
                    available: false,
                }
            }
        }
    }

    /// Fallible variant of [`get_progress`](Self::get_progress)
    pub async fn try_get_progress(&self) -> std::result::Result<TelemetrySample, TelemetryError> {
        let progress = self
            .call("progress", self.backend.progress())
            .await
            .map_err(unavailable)?
            .map_err(unavailable)?;

        let track_id = self
            .call("active_track", self.backend.active_track())
            .await
            .map_err(unavailable)?
            .map_err(unavailable)?;

        let mut state = self.state();
        if progress.duration_seconds.is_finite() && progress.duration_seconds > 0.0 {
            state.last_known_duration = progress.duration_seconds;
        }

        Ok(TelemetrySample {
            track_id,
            position_seconds: progress.position_seconds,
            duration_seconds: state.last_known_duration,
            available: true,
        })
    }

    /// Release the backend queue on shutdown
    pub async fn teardown(&self) {
        let _guard = self.calls.lock().await;
        self.reset_locked().await;
        debug!("Playback adapter torn down");
    }

    async fn reset_locked(&self) {
        match self.call("reset", self.backend.reset()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Ignoring reset failure: {}", e),
            Err(e) => warn!("Ignoring reset failure: {}", e),
        }

        let mut state = self.state();
        state.queued = None;
        state.is_playing = false;
        state.last_known_duration = 0.0;
    }

    async fn add_locked(&self, track: &Track) -> Result<()> {
        match self.call("load", self.backend.add(track)).await? {
            Ok(()) => {
                let mut state = self.state();
                state.queued = Some(track.id.clone());
                state.is_playing = false;
                state.last_known_duration = track
                    .duration_seconds
                    .filter(|d| d.is_finite() && *d > 0.0)
                    .unwrap_or(0.0);
                debug!(track_id = %track.id, url = %track.url, "Track queued");
                Ok(())
            }
            Err(e) => {
                error!(track_id = %track.id, "Failed to queue track: {}", e);
                Err(PlaybackError::LoadFailed {
                    track_id: track.id.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn clamp_seek(&self, position_seconds: f64) -> f64 {
        let duration = self.state().last_known_duration;
        let target = if position_seconds.is_finite() {
            position_seconds.max(0.0)
        } else {
            0.0
        };
        if duration > 0.0 {
            target.min(duration)
        } else {
            target
        }
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = std::result::Result<T, BackendError>>,
    ) -> Result<std::result::Result<T, BackendError>> {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .map_err(|_| {
                let timeout_ms = u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(operation, timeout_ms, "Playback backend call timed out");
                PlaybackError::Timeout {
                    operation,
                    timeout_ms,
                }
            })
    }

    fn state(&self) -> MutexGuard<'_, AdapterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn unavailable(err: impl std::fmt::Display) -> TelemetryError {
    TelemetryError::BackendUnavailable(err.to_string())
}
