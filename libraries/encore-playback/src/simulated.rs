//! In-process playback backend
//!
//! Advances the play head from the tokio clock, so tests can drive it with
//! paused time. Holds at most one queued track. Supports fault injection
//! for exercising the adapter's error paths.

use crate::backend::{BackendError, BackendEvent, PlaybackBackend};
use crate::types::{BackendProgress, PlayerOptions, Track};
use async_trait::async_trait;
use encore_core::ChallengeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Backend operation, used for fault injection and call logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Setup,
    Reset,
    Add,
    Play,
    Pause,
    SeekTo,
    Progress,
    ActiveTrack,
}

#[derive(Debug, Clone)]
enum Fault {
    Fail(BackendError),
    Hang,
}

#[derive(Debug)]
struct SimState {
    initialized: bool,
    queue: Option<Track>,
    position: f64,
    /// Set while playing
    resumed_at: Option<Instant>,
    speed: f64,
    unavailable: bool,
    ended_reported: bool,
    faults: HashMap<Operation, Fault>,
    load_delays: HashMap<ChallengeId, Duration>,
    calls: Vec<Operation>,
}

impl SimState {
    fn duration(&self) -> f64 {
        self.queue
            .as_ref()
            .and_then(|t| t.duration_seconds)
            .unwrap_or(0.0)
    }

    /// Move the play head to `now`; returns the track id on natural end
    fn advance(&mut self, now: Instant) -> Option<ChallengeId> {
        let started = self.resumed_at?;
        self.position += now.duration_since(started).as_secs_f64() * self.speed;
        self.resumed_at = Some(now);

        let duration = self.duration();
        if duration > 0.0 && self.position >= duration {
            self.position = duration;
            self.resumed_at = None;
            if !self.ended_reported {
                self.ended_reported = true;
                return self.queue.as_ref().map(|t| t.id.clone());
            }
        }
        None
    }
}

/// Simulated audio service
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
    events: broadcast::Sender<BackendEvent>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::with_speed(1.0)
    }

    /// Play `speed` seconds of audio per wall-clock second
    pub fn with_speed(speed: f64) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            state: Arc::new(Mutex::new(SimState {
                initialized: false,
                queue: None,
                position: 0.0,
                resumed_at: None,
                speed: if speed.is_finite() && speed > 0.0 { speed } else { 1.0 },
                unavailable: false,
                ended_reported: false,
                faults: HashMap::new(),
                load_delays: HashMap::new(),
                calls: Vec::new(),
            })),
            events,
        }
    }

    /// Fail the next call of `operation` with `error`
    pub fn fail_next(&self, operation: Operation, error: BackendError) {
        self.state().faults.insert(operation, Fault::Fail(error));
    }

    /// Never answer the next call of `operation`
    pub fn hang_next(&self, operation: Operation) {
        self.state().faults.insert(operation, Fault::Hang);
    }

    /// Make position and active-track reads fail until cleared
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Delay every `add` of the given track
    pub fn delay_load(&self, id: impl Into<ChallengeId>, delay: Duration) {
        self.state().load_delays.insert(id.into(), delay);
    }

    /// Move the play head without going through the adapter
    pub fn set_position(&self, position_seconds: f64) {
        let mut state = self.state();
        let now = Instant::now();
        if state.resumed_at.is_some() {
            state.resumed_at = Some(now);
        }
        state.position = position_seconds;
        state.ended_reported = false;
    }

    /// Push a notification to subscribers
    pub fn emit(&self, event: BackendEvent) {
        let _ = self.events.send(event);
    }

    pub fn queued_track(&self) -> Option<ChallengeId> {
        self.state().queue.as_ref().map(|t| t.id.clone())
    }

    pub fn is_playing(&self) -> bool {
        self.state().resumed_at.is_some()
    }

    pub fn position(&self) -> f64 {
        let mut state = self.state();
        state.advance(Instant::now());
        state.position
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<Operation> {
        self.state().calls.clone()
    }

    async fn enter(&self, operation: Operation) -> Result<(), BackendError> {
        let fault = {
            let mut state = self.state();
            state.calls.push(operation);
            if state.unavailable && matches!(operation, Operation::Progress | Operation::ActiveTrack)
            {
                return Err(BackendError::Unavailable("player service not running".into()));
            }
            state.faults.remove(&operation)
        };

        match fault {
            None => Ok(()),
            Some(Fault::Fail(error)) => Err(error),
            Some(Fault::Hang) => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    fn advance(&self, state: &mut SimState) {
        if let Some(track_id) = state.advance(Instant::now()) {
            let _ = self.events.send(BackendEvent::TrackEnded { track_id });
            let _ = self
                .events
                .send(BackendEvent::PlaybackStateChanged { playing: false });
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PlaybackBackend for SimulatedBackend {
    async fn setup(&self, _options: &PlayerOptions) -> Result<(), BackendError> {
        self.enter(Operation::Setup).await?;
        let mut state = self.state();
        if state.initialized {
            return Err(BackendError::AlreadyInitialized);
        }
        state.initialized = true;
        Ok(())
    }

    async fn reset(&self) -> Result<(), BackendError> {
        self.enter(Operation::Reset).await?;
        let mut state = self.state();
        state.queue = None;
        state.position = 0.0;
        state.resumed_at = None;
        state.ended_reported = false;
        Ok(())
    }

    async fn add(&self, track: &Track) -> Result<(), BackendError> {
        self.enter(Operation::Add).await?;

        let delay = self.state().load_delays.get(&track.id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut state = self.state();
            if !state.initialized {
                return Err(BackendError::NotInitialized);
            }
            state.queue = Some(track.clone());
            state.position = 0.0;
            state.resumed_at = None;
            state.ended_reported = false;
        }

        self.emit(BackendEvent::ActiveTrackChanged {
            track_id: Some(track.id.clone()),
        });
        Ok(())
    }

    async fn play(&self) -> Result<(), BackendError> {
        self.enter(Operation::Play).await?;
        let mut state = self.state();
        if state.queue.is_none() {
            return Err(BackendError::Rejected("queue is empty".into()));
        }
        self.advance(&mut state);
        if state.resumed_at.is_none() {
            let duration = state.duration();
            if duration > 0.0 && state.position >= duration {
                state.position = 0.0;
                state.ended_reported = false;
            }
            state.resumed_at = Some(Instant::now());
        }
        Ok(())
    }

    async fn pause(&self) -> Result<(), BackendError> {
        self.enter(Operation::Pause).await?;
        let mut state = self.state();
        self.advance(&mut state);
        state.resumed_at = None;
        Ok(())
    }

    async fn seek_to(&self, position_seconds: f64) -> Result<(), BackendError> {
        self.enter(Operation::SeekTo).await?;
        let mut state = self.state();
        if state.queue.is_none() {
            return Err(BackendError::Rejected("queue is empty".into()));
        }
        self.advance(&mut state);
        state.position = position_seconds;
        if state.resumed_at.is_some() {
            state.resumed_at = Some(Instant::now());
        }
        if position_seconds < state.duration() {
            state.ended_reported = false;
        }
        Ok(())
    }

    async fn progress(&self) -> Result<BackendProgress, BackendError> {
        self.enter(Operation::Progress).await?;
        let mut state = self.state();
        self.advance(&mut state);
        Ok(BackendProgress {
            position_seconds: state.position,
            duration_seconds: state.duration(),
        })
    }

    async fn active_track(&self) -> Result<Option<ChallengeId>, BackendError> {
        self.enter(Operation::ActiveTrack).await?;
        Ok(self.queued_track())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<BackendEvent>> {
        Some(self.events.subscribe())
    }
}
