//! Sync controller - session state machine
//!
//! Synchronous core of the sync engine. It owns the single playback session
//! and decides what each adapter outcome, telemetry sample or backend
//! notification does to the session and to challenge progress. It performs
//! no I/O: the engine calls the adapter and feeds results back here, tagged
//! with the generation the work was started under.

use crate::error::{ErrorReport, PlaybackError, Result, StateError};
use crate::events::SyncEvent;
use crate::types::{PlaybackSession, SessionState, TaggedTelemetry, Track};
use encore_core::progress::{compute_progress, MAX_PROGRESS};
use encore_core::selectors::{select_user_stats, NowPlaying};
use encore_core::{ChallengeId, ChallengeStore, CoreError, ProgressRecord};
use tracing::{debug, info};

/// Work the engine must perform after a selection
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTicket {
    pub generation: u64,
    pub track: Track,
}

/// Progress change that must be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressCommit {
    pub challenge_id: ChallengeId,
    pub record: ProgressRecord,
    pub newly_completed: bool,
    /// Points granted by this commit; zero unless newly completed
    pub points_awarded: u32,
}

/// Session state machine
#[derive(Debug, Default)]
pub struct SyncController {
    session: PlaybackSession,
    generation: u64,
    /// Set when the backend moved to another track behind the session's back
    track_replaced: bool,
    pending_events: Vec<SyncEvent>,
}

impl SyncController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    /// Latest generation; bumped by every selection and reset
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active_challenge_id(&self) -> Option<&ChallengeId> {
        self.session.active_challenge_id.as_ref()
    }

    /// Whether the backend no longer holds the session's track
    pub fn track_replaced(&self) -> bool {
        self.track_replaced
    }

    /// Now-playing view for card selectors
    pub fn now_playing(&self) -> Option<NowPlaying> {
        self.session
            .active_challenge_id
            .as_ref()
            .map(|challenge_id| NowPlaying {
                challenge_id: challenge_id.clone(),
                is_playing: self.session.state == SessionState::Playing,
            })
    }

    // ===== Selection =====

    /// Start a new session for a challenge
    ///
    /// Allowed from any state. Any work still in flight for the previous
    /// session becomes stale.
    pub fn select(&mut self, store: &ChallengeStore, challenge_id: &str) -> Result<LoadTicket> {
        let challenge = store
            .get(challenge_id)
            .ok_or_else(|| StateError::UnknownChallenge(ChallengeId::from(challenge_id)))?;

        self.generation += 1;
        self.track_replaced = false;
        self.session = PlaybackSession {
            active_challenge_id: Some(challenge.id.clone()),
            generation: self.generation,
            position_seconds: 0.0,
            duration_seconds: challenge.duration_seconds,
            is_playing: false,
            state: SessionState::Loading,
        };

        info!(challenge_id, generation = self.generation, "Session started");
        self.pending_events.push(SyncEvent::SessionStarted {
            challenge_id: challenge.id.clone(),
            generation: self.generation,
        });
        self.emit_state_changed();

        Ok(LoadTicket {
            generation: self.generation,
            track: Track::from(challenge),
        })
    }

    /// Apply the outcome of the load started by [`select`](Self::select)
    pub fn resolve_load(
        &mut self,
        generation: u64,
        outcome: std::result::Result<(), PlaybackError>,
    ) -> Result<()> {
        self.check_generation(generation)?;
        self.expect_state(&[SessionState::Loading], "finish loading")?;

        match outcome {
            Ok(()) => {
                self.set_state(SessionState::Ready);
                Ok(())
            }
            Err(e) => {
                self.session = PlaybackSession {
                    generation: self.generation,
                    ..PlaybackSession::default()
                };
                self.emit_error(&e);
                self.emit_state_changed();
                Err(e.into())
            }
        }
    }

    // ===== Transport =====

    /// Check that play is allowed, returning the generation to tag it with
    pub fn begin_play(&self) -> Result<u64> {
        self.expect_state(&[SessionState::Ready, SessionState::Paused], "play")?;
        if self.track_replaced {
            return Err(StateError::InvalidTransition {
                state: self.session.state,
                action: "resume a replaced track",
            }
            .into());
        }
        Ok(self.generation)
    }

    pub fn resolve_play(
        &mut self,
        generation: u64,
        outcome: std::result::Result<(), PlaybackError>,
    ) -> Result<()> {
        self.check_generation(generation)?;
        match outcome {
            Ok(()) => {
                self.session.is_playing = true;
                self.set_state(SessionState::Playing);
                Ok(())
            }
            Err(e) => {
                self.session.is_playing = false;
                self.emit_error(&e);
                Err(e.into())
            }
        }
    }

    /// Check that pause is allowed, returning the generation to tag it with
    ///
    /// A completed session can still be paused while the backend keeps
    /// playing its track.
    pub fn begin_pause(&self) -> Result<u64> {
        if self.session.state == SessionState::Completed && self.session.is_playing {
            return Ok(self.generation);
        }
        self.expect_state(&[SessionState::Playing], "pause")?;
        Ok(self.generation)
    }

    pub fn resolve_pause(
        &mut self,
        generation: u64,
        outcome: std::result::Result<(), PlaybackError>,
    ) -> Result<()> {
        self.check_generation(generation)?;
        match outcome {
            Ok(()) => {
                self.session.is_playing = false;
                if self.session.state == SessionState::Playing {
                    self.set_state(SessionState::Paused);
                }
                Ok(())
            }
            Err(e) => {
                self.emit_error(&e);
                Err(e.into())
            }
        }
    }

    /// Check that seek is allowed, returning the generation to tag it with
    pub fn begin_seek(&self) -> Result<u64> {
        self.expect_state(
            &[SessionState::Ready, SessionState::Playing, SessionState::Paused],
            "seek",
        )?;
        Ok(self.generation)
    }

    /// Apply a seek outcome; the clamped target counts as a sample
    pub fn resolve_seek(
        &mut self,
        store: &mut ChallengeStore,
        generation: u64,
        outcome: std::result::Result<f64, PlaybackError>,
    ) -> Result<Option<ProgressCommit>> {
        self.check_generation(generation)?;
        match outcome {
            Ok(target) => {
                let duration = self.session.duration_seconds;
                self.apply_sample(store, target, duration)
            }
            Err(e) => {
                self.emit_error(&e);
                Err(e.into())
            }
        }
    }

    // ===== Telemetry =====

    /// Apply a telemetry sample
    ///
    /// Samples only count while playing. Samples from a superseded session
    /// are rejected; samples for another track or from an unavailable
    /// backend are ignored.
    pub fn on_telemetry(
        &mut self,
        store: &mut ChallengeStore,
        telemetry: &TaggedTelemetry,
    ) -> Result<Option<ProgressCommit>> {
        self.check_generation(telemetry.generation)?;

        if self.session.state != SessionState::Playing || self.track_replaced {
            return Ok(None);
        }

        let sample = &telemetry.sample;
        if !sample.available {
            debug!("Holding last known progress while telemetry is unavailable");
            return Ok(None);
        }

        if let Some(track_id) = &sample.track_id {
            if self.session.active_challenge_id.as_ref() != Some(track_id) {
                debug!(%track_id, "Ignoring telemetry for inactive track");
                return Ok(None);
            }
        }

        self.apply_sample(store, sample.position_seconds, sample.duration_seconds)
    }

    /// The backend played the active track to its end
    ///
    /// `generation` is the session the notification was observed under.
    pub fn on_track_ended(
        &mut self,
        store: &mut ChallengeStore,
        generation: u64,
        track_id: &ChallengeId,
    ) -> Result<Option<ProgressCommit>> {
        self.check_generation(generation)?;
        if self.track_replaced || self.session.active_challenge_id.as_ref() != Some(track_id) {
            return Ok(None);
        }
        if !matches!(
            self.session.state,
            SessionState::Playing | SessionState::Paused
        ) {
            return Ok(None);
        }

        let duration = self.session.duration_seconds;
        self.apply_sample(store, duration, duration)
    }

    /// The backend started or stopped playing on its own
    pub fn on_backend_playing(&mut self, generation: u64, playing: bool) -> Result<()> {
        self.check_generation(generation)?;
        match (self.session.state, playing) {
            (SessionState::Playing, false) => {
                self.session.is_playing = false;
                self.set_state(SessionState::Paused);
            }
            (SessionState::Ready | SessionState::Paused, true) if !self.track_replaced => {
                self.session.is_playing = true;
                self.set_state(SessionState::Playing);
            }
            (SessionState::Completed, playing) => self.session.is_playing = playing,
            _ => {}
        }
        Ok(())
    }

    /// The backend switched its active track
    ///
    /// Moving off the session's track stops the session from earning
    /// progress: a playing session is paused and later samples and track-end
    /// notifications are ignored until the challenge is played again.
    pub fn on_active_track_changed(
        &mut self,
        generation: u64,
        track_id: Option<&ChallengeId>,
    ) -> Result<()> {
        self.check_generation(generation)?;
        if track_id == self.session.active_challenge_id.as_ref() {
            self.track_replaced = false;
            return Ok(());
        }
        if !matches!(
            self.session.state,
            SessionState::Ready | SessionState::Playing | SessionState::Paused
        ) {
            return Ok(());
        }

        info!(?track_id, "Backend moved off the session track");
        self.track_replaced = true;
        if self.session.state == SessionState::Playing {
            self.session.is_playing = false;
            self.set_state(SessionState::Paused);
        }
        Ok(())
    }

    /// End the session and invalidate in-flight work
    pub fn reset(&mut self) {
        self.generation += 1;
        self.track_replaced = false;
        self.session = PlaybackSession {
            generation: self.generation,
            ..PlaybackSession::default()
        };
        self.emit_state_changed();
    }

    // ===== Events =====

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<SyncEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // ===== Internals =====

    fn apply_sample(
        &mut self,
        store: &mut ChallengeStore,
        position_seconds: f64,
        duration_seconds: f64,
    ) -> Result<Option<ProgressCommit>> {
        let challenge_id = self
            .session
            .active_challenge_id
            .clone()
            .ok_or(StateError::NoActiveSession)?;

        if position_seconds.is_finite() {
            self.session.position_seconds = position_seconds;
        }
        if duration_seconds.is_finite() && duration_seconds > 0.0 {
            self.session.duration_seconds = duration_seconds;
        }
        self.pending_events.push(SyncEvent::PositionUpdated {
            position_seconds: self.session.position_seconds,
            duration_seconds: self.session.duration_seconds,
        });

        let challenge = store
            .get(challenge_id.as_str())
            .ok_or_else(|| CoreError::not_found(challenge_id.clone()))?;
        let points = challenge.points;
        let progress = compute_progress(challenge, position_seconds, duration_seconds);
        let change = store.apply_progress(challenge_id.as_str(), progress)?;

        let commit = if change.is_changed() {
            self.pending_events.push(SyncEvent::ProgressUpdated {
                challenge_id: challenge_id.clone(),
                progress: change.current.progress,
            });

            let newly_completed = change.newly_completed();
            if newly_completed {
                info!(%challenge_id, points, "Challenge completed");
                self.pending_events.push(SyncEvent::ChallengeCompleted {
                    challenge_id: challenge_id.clone(),
                    points_awarded: points,
                });
            }
            self.pending_events
                .push(SyncEvent::stats_changed(&select_user_stats(store)));

            Some(ProgressCommit {
                challenge_id,
                record: change.current,
                newly_completed,
                points_awarded: if newly_completed { points } else { 0 },
            })
        } else {
            None
        };

        if progress >= MAX_PROGRESS && self.session.state != SessionState::Completed {
            self.set_state(SessionState::Completed);
        }

        Ok(commit)
    }

    fn check_generation(&self, generation: u64) -> std::result::Result<(), StateError> {
        if generation == self.generation {
            Ok(())
        } else {
            debug!(
                received = generation,
                current = self.generation,
                "Discarding stale resolution"
            );
            Err(StateError::StaleGeneration {
                current: self.generation,
                received: generation,
            })
        }
    }

    fn expect_state(
        &self,
        allowed: &[SessionState],
        action: &'static str,
    ) -> std::result::Result<(), StateError> {
        let state = self.session.state;
        if allowed.contains(&state) {
            Ok(())
        } else if state == SessionState::Idle {
            Err(StateError::NoActiveSession)
        } else {
            Err(StateError::InvalidTransition { state, action })
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.session.state != state {
            self.session.state = state;
            self.emit_state_changed();
        }
    }

    fn emit_state_changed(&mut self) {
        self.pending_events.push(SyncEvent::StateChanged {
            state: self.session.state,
        });
    }

    fn emit_error(&mut self, error: &PlaybackError) {
        self.pending_events.push(SyncEvent::Error {
            report: ErrorReport::from(error.clone()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::types::TelemetrySample;
    use encore_core::{Challenge, Difficulty};

    fn store() -> ChallengeStore {
        ChallengeStore::new(vec![
            Challenge::new("c1", "One", "A", Difficulty::Easy, 180.0, 50),
            Challenge::new("c2", "Two", "B", Difficulty::Hard, 300.0, 200),
        ])
        .unwrap()
    }

    fn sample(generation: u64, track: &str, position: f64, duration: f64) -> TaggedTelemetry {
        TaggedTelemetry {
            generation,
            sample: TelemetrySample {
                track_id: Some(ChallengeId::from(track)),
                position_seconds: position,
                duration_seconds: duration,
                available: true,
            },
        }
    }

    /// Select and load `id`, then start playing
    fn playing(controller: &mut SyncController, store: &ChallengeStore, id: &str) -> u64 {
        let ticket = controller.select(store, id).unwrap();
        controller.resolve_load(ticket.generation, Ok(())).unwrap();
        let generation = controller.begin_play().unwrap();
        controller.resolve_play(generation, Ok(())).unwrap();
        generation
    }

    #[test]
    fn select_enters_loading_with_new_generation() {
        let store = store();
        let mut controller = SyncController::new();

        let ticket = controller.select(&store, "c1").unwrap();
        assert_eq!(ticket.generation, 1);
        assert_eq!(ticket.track.id.as_str(), "c1");
        assert_eq!(controller.state(), SessionState::Loading);
        assert_eq!(controller.session().duration_seconds, 180.0);

        let events = controller.drain_events();
        assert!(matches!(events[0], SyncEvent::SessionStarted { generation: 1, .. }));
        assert_eq!(
            events[1],
            SyncEvent::StateChanged {
                state: SessionState::Loading
            }
        );
    }

    #[test]
    fn select_unknown_challenge() {
        let mut controller = SyncController::new();
        let err = controller.select(&store(), "nope").unwrap_err();
        assert!(matches!(
            err,
            SyncError::State(StateError::UnknownChallenge(_))
        ));
        assert_eq!(controller.generation(), 0);
    }

    #[test]
    fn stale_load_resolution_is_discarded() {
        let store = store();
        let mut controller = SyncController::new();

        let first = controller.select(&store, "c1").unwrap();
        let second = controller.select(&store, "c2").unwrap();

        let err = controller.resolve_load(first.generation, Ok(())).unwrap_err();
        assert!(err.is_benign());
        assert_eq!(controller.state(), SessionState::Loading);

        controller.resolve_load(second.generation, Ok(())).unwrap();
        assert_eq!(controller.state(), SessionState::Ready);
        assert_eq!(controller.active_challenge_id().unwrap().as_str(), "c2");
    }

    #[test]
    fn failed_load_returns_to_idle() {
        let store = store();
        let mut controller = SyncController::new();
        let ticket = controller.select(&store, "c1").unwrap();
        controller.drain_events();

        let err = controller
            .resolve_load(
                ticket.generation,
                Err(PlaybackError::LoadFailed {
                    track_id: "c1".into(),
                    reason: "404".into(),
                }),
            )
            .unwrap_err();

        assert_eq!(err.code(), "LOAD_FAILED");
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.active_challenge_id().is_none());
        let events = controller.drain_events();
        assert!(matches!(&events[0], SyncEvent::Error { report } if report.code == "LOAD_FAILED"));
    }

    #[test]
    fn failed_play_keeps_previous_state() {
        let store = store();
        let mut controller = SyncController::new();
        let ticket = controller.select(&store, "c1").unwrap();
        controller.resolve_load(ticket.generation, Ok(())).unwrap();

        let generation = controller.begin_play().unwrap();
        let err = controller
            .resolve_play(generation, Err(PlaybackError::transport("play", "denied")))
            .unwrap_err();

        assert_eq!(err.code(), "TRANSPORT_FAILED");
        assert_eq!(controller.state(), SessionState::Ready);
        assert!(!controller.session().is_playing);
    }

    #[test]
    fn transport_requires_session() {
        let controller = SyncController::new();
        assert!(matches!(
            controller.begin_play(),
            Err(SyncError::State(StateError::NoActiveSession))
        ));
        assert!(matches!(
            controller.begin_pause(),
            Err(SyncError::State(StateError::NoActiveSession))
        ));
    }

    #[test]
    fn pause_only_while_playing() {
        let store = store();
        let mut controller = SyncController::new();
        let ticket = controller.select(&store, "c1").unwrap();
        controller.resolve_load(ticket.generation, Ok(())).unwrap();

        assert!(matches!(
            controller.begin_pause(),
            Err(SyncError::State(StateError::InvalidTransition {
                state: SessionState::Ready,
                ..
            }))
        ));
    }

    #[test]
    fn telemetry_updates_progress_while_playing() {
        let mut store = store();
        let mut controller = SyncController::new();
        let generation = playing(&mut controller, &store, "c1");

        let commit = controller
            .on_telemetry(&mut store, &sample(generation, "c1", 90.0, 180.0))
            .unwrap()
            .unwrap();
        assert_eq!(commit.record.progress, 50.0);
        assert!(!commit.newly_completed);
        assert_eq!(controller.session().position_seconds, 90.0);
        assert_eq!(store.get("c1").unwrap().progress, 50.0);
    }

    #[test]
    fn completion_awards_points_once() {
        let mut store = store();
        let mut controller = SyncController::new();
        let generation = playing(&mut controller, &store, "c1");
        controller.drain_events();

        let commit = controller
            .on_telemetry(&mut store, &sample(generation, "c1", 180.0, 180.0))
            .unwrap()
            .unwrap();
        assert!(commit.newly_completed);
        assert_eq!(commit.points_awarded, 50);
        assert_eq!(controller.state(), SessionState::Completed);

        let completions = controller
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SyncEvent::ChallengeCompleted { .. }))
            .count();
        assert_eq!(completions, 1);

        // Completed sessions ignore further ticks
        assert_eq!(
            controller
                .on_telemetry(&mut store, &sample(generation, "c1", 180.0, 180.0))
                .unwrap(),
            None
        );

        // Replaying the challenge does not award again
        let generation = playing(&mut controller, &store, "c1");
        let commit = controller
            .on_telemetry(&mut store, &sample(generation, "c1", 180.0, 180.0))
            .unwrap();
        assert_eq!(commit, None);
        assert_eq!(controller.state(), SessionState::Completed);
        assert!(!controller
            .drain_events()
            .iter()
            .any(|e| matches!(e, SyncEvent::ChallengeCompleted { .. })));
    }

    #[test]
    fn stale_telemetry_is_rejected() {
        let mut store = store();
        let mut controller = SyncController::new();
        let old = playing(&mut controller, &store, "c1");
        let current = playing(&mut controller, &store, "c2");

        let err = controller
            .on_telemetry(&mut store, &sample(old, "c1", 180.0, 180.0))
            .unwrap_err();
        assert!(err.is_benign());
        assert_eq!(store.get("c1").unwrap().progress, 0.0);

        // Current generation but the backend still reports the old track
        let result = controller
            .on_telemetry(&mut store, &sample(current, "c1", 180.0, 180.0))
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(store.get("c1").unwrap().progress, 0.0);
        assert_eq!(store.get("c2").unwrap().progress, 0.0);
    }

    #[test]
    fn unavailable_telemetry_holds_progress() {
        let mut store = store();
        let mut controller = SyncController::new();
        let generation = playing(&mut controller, &store, "c1");
        controller
            .on_telemetry(&mut store, &sample(generation, "c1", 45.0, 180.0))
            .unwrap();

        let unavailable = TaggedTelemetry {
            generation,
            sample: TelemetrySample {
                duration_seconds: 180.0,
                ..TelemetrySample::default()
            },
        };
        assert_eq!(controller.on_telemetry(&mut store, &unavailable).unwrap(), None);
        assert_eq!(store.get("c1").unwrap().progress, 25.0);
        assert_eq!(controller.session().position_seconds, 45.0);
    }

    #[test]
    fn telemetry_ignored_when_not_playing() {
        let mut store = store();
        let mut controller = SyncController::new();
        let ticket = controller.select(&store, "c1").unwrap();
        controller.resolve_load(ticket.generation, Ok(())).unwrap();

        let result = controller
            .on_telemetry(&mut store, &sample(ticket.generation, "c1", 90.0, 180.0))
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(store.get("c1").unwrap().progress, 0.0);
    }

    #[test]
    fn seek_past_end_completes() {
        let mut store = store();
        let mut controller = SyncController::new();
        let ticket = controller.select(&store, "c1").unwrap();
        controller.resolve_load(ticket.generation, Ok(())).unwrap();

        let generation = controller.begin_seek().unwrap();
        let commit = controller
            .resolve_seek(&mut store, generation, Ok(180.0))
            .unwrap()
            .unwrap();
        assert!(commit.newly_completed);
        assert_eq!(controller.state(), SessionState::Completed);
    }

    #[test]
    fn backward_seek_keeps_progress() {
        let mut store = store();
        let mut controller = SyncController::new();
        let generation = playing(&mut controller, &store, "c1");
        controller
            .on_telemetry(&mut store, &sample(generation, "c1", 120.0, 180.0))
            .unwrap();

        let commit = controller
            .resolve_seek(&mut store, generation, Ok(10.0))
            .unwrap();
        assert_eq!(commit, None);
        assert_eq!(controller.session().position_seconds, 10.0);
        assert!((store.get("c1").unwrap().progress - 66.666).abs() < 0.01);
    }

    #[test]
    fn track_end_counts_as_full_playback() {
        let mut store = store();
        let mut controller = SyncController::new();
        let generation = playing(&mut controller, &store, "c2");

        let commit = controller
            .on_track_ended(&mut store, generation, &ChallengeId::from("c2"))
            .unwrap()
            .unwrap();
        assert_eq!(commit.points_awarded, 200);

        // End of a track that is not the active one is ignored
        assert_eq!(
            controller
                .on_track_ended(&mut store, generation, &ChallengeId::from("c1"))
                .unwrap(),
            None
        );
    }

    #[test]
    fn track_end_from_previous_session_is_rejected() {
        let mut store = store();
        let mut controller = SyncController::new();
        let old = playing(&mut controller, &store, "c1");
        controller
            .on_telemetry(&mut store, &sample(old, "c1", 60.0, 180.0))
            .unwrap();

        // Same challenge selected again; the old session's end arrives late
        let current = playing(&mut controller, &store, "c1");
        let err = controller
            .on_track_ended(&mut store, old, &ChallengeId::from("c1"))
            .unwrap_err();
        assert!(err.is_benign());
        assert_eq!(controller.state(), SessionState::Playing);
        assert!(!store.get("c1").unwrap().completed);

        controller
            .on_track_ended(&mut store, current, &ChallengeId::from("c1"))
            .unwrap();
        assert!(store.get("c1").unwrap().completed);
    }

    #[test]
    fn completed_session_can_be_paused_while_backend_plays() {
        let mut store = store();
        let mut controller = SyncController::new();
        let generation = playing(&mut controller, &store, "c1");
        controller
            .on_telemetry(&mut store, &sample(generation, "c1", 180.0, 180.0))
            .unwrap();
        assert_eq!(controller.state(), SessionState::Completed);
        assert!(controller.session().is_playing);

        let generation = controller.begin_pause().unwrap();
        controller.resolve_pause(generation, Ok(())).unwrap();
        assert_eq!(controller.state(), SessionState::Completed);
        assert!(!controller.session().is_playing);

        // Nothing left to stop
        assert!(matches!(
            controller.begin_pause(),
            Err(SyncError::State(StateError::InvalidTransition {
                state: SessionState::Completed,
                ..
            }))
        ));
    }

    #[test]
    fn backend_pause_is_mirrored() {
        let store = store();
        let mut controller = SyncController::new();
        let generation = playing(&mut controller, &store, "c1");

        controller.on_backend_playing(generation, false).unwrap();
        assert_eq!(controller.state(), SessionState::Paused);
        controller.on_backend_playing(generation, true).unwrap();
        assert_eq!(controller.state(), SessionState::Playing);

        assert!(controller.on_backend_playing(generation - 1, false).is_err());
        assert_eq!(controller.state(), SessionState::Playing);
    }

    #[test]
    fn backend_track_change_stops_progress() {
        let mut store = store();
        let mut controller = SyncController::new();
        let generation = playing(&mut controller, &store, "c1");
        controller
            .on_telemetry(&mut store, &sample(generation, "c1", 45.0, 180.0))
            .unwrap();

        controller
            .on_active_track_changed(generation, Some(&ChallengeId::from("c2")))
            .unwrap();
        assert!(controller.track_replaced());
        assert_eq!(controller.state(), SessionState::Paused);
        assert!(!controller.session().is_playing);

        // Samples and track end no longer count, even for the session track
        controller.on_backend_playing(generation, true).unwrap();
        assert_eq!(controller.state(), SessionState::Paused);
        assert_eq!(
            controller
                .on_track_ended(&mut store, generation, &ChallengeId::from("c1"))
                .unwrap(),
            None
        );
        assert_eq!(store.get("c1").unwrap().progress, 25.0);
        assert!(controller.begin_play().is_err());

        // Playing the challenge again starts clean
        playing(&mut controller, &store, "c1");
        assert!(!controller.track_replaced());
    }

    #[test]
    fn reset_invalidates_in_flight_work() {
        let store = store();
        let mut controller = SyncController::new();
        let ticket = controller.select(&store, "c1").unwrap();
        controller.reset();

        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.resolve_load(ticket.generation, Ok(())).is_err());
        assert_eq!(controller.state(), SessionState::Idle);
    }
}
