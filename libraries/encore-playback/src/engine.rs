//! Sync engine - async driver
//!
//! Owns the playback adapter and the session controller and connects them
//! to the outside world:
//! - Loads run on spawned tasks and report back tagged with the generation
//!   they were started for; resolutions for superseded sessions are dropped
//! - A periodic telemetry poll feeds samples while playing
//! - Backend notifications (natural track end, external pause, track
//!   changes) are applied to the session whose load they were observed after
//! - A session that completes while audio is still running is paused
//! - Every progress commit is written to the [`ProgressStore`]
//!
//! The engine can be driven directly through `&mut self` methods, or moved
//! onto a task with [`SyncEngine::spawn`] and controlled through an
//! [`EngineHandle`].

use crate::adapter::PlaybackAdapter;
use crate::backend::{BackendEvent, PlaybackBackend};
use crate::controller::{LoadTicket, ProgressCommit, SyncController};
use crate::error::{PlaybackError, Result, StateError, SyncError};
use crate::events::SyncEvent;
use crate::shared::SharedStore;
use crate::types::{EngineConfig, PlaybackSession, SessionState, TaggedTelemetry};
use encore_core::selectors::NowPlaying;
use encore_core::{ChallengeId, ChallengeStore, ProgressStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Capacity of the engine command channel
const COMMAND_BUFFER: usize = 32;

#[derive(Debug)]
struct LoadResolution {
    generation: u64,
    outcome: std::result::Result<(), PlaybackError>,
}

#[derive(Debug)]
struct PendingPlay {
    generation: u64,
    reply: oneshot::Sender<Result<()>>,
}

/// Playback–progress synchronization engine
pub struct SyncEngine<B: PlaybackBackend> {
    adapter: Arc<PlaybackAdapter<B>>,
    controller: SyncController,
    store: SharedStore,
    progress_store: Arc<dyn ProgressStore>,
    latest_generation: Arc<AtomicU64>,
    loads_tx: mpsc::UnboundedSender<LoadResolution>,
    loads_rx: mpsc::UnboundedReceiver<LoadResolution>,
    events: broadcast::Sender<SyncEvent>,
    config: EngineConfig,
    /// Session that backend notifications are attributed to; the last one
    /// whose load finished
    backend_generation: u64,
    pending_plays: Vec<PendingPlay>,
}

impl<B: PlaybackBackend> SyncEngine<B> {
    pub fn new(
        backend: B,
        store: SharedStore,
        progress_store: Arc<dyn ProgressStore>,
        config: EngineConfig,
    ) -> Self {
        let (loads_tx, loads_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_buffer.max(1));

        Self {
            adapter: Arc::new(PlaybackAdapter::new(backend, config.call_timeout())),
            controller: SyncController::new(),
            store,
            progress_store,
            latest_generation: Arc::new(AtomicU64::new(0)),
            loads_tx,
            loads_rx,
            events,
            config,
            backend_generation: 0,
            pending_plays: Vec::new(),
        }
    }

    /// Seed the catalog from persisted progress, build the engine and set up
    /// the player
    pub async fn bootstrap(
        backend: B,
        mut catalog: ChallengeStore,
        progress_store: Arc<dyn ProgressStore>,
        config: EngineConfig,
    ) -> Result<Self> {
        let records = progress_store.load_all().await?;
        let seeded = catalog.seed_progress(records);
        info!(
            challenges = catalog.len(),
            seeded, "Loaded persisted challenge progress"
        );

        let engine = Self::new(backend, SharedStore::new(catalog), progress_store, config);
        engine.start().await?;
        Ok(engine)
    }

    /// Set up the player; repeated setup is not an error
    pub async fn start(&self) -> Result<()> {
        match self.adapter.setup(&self.config.player).await {
            Ok(()) | Err(PlaybackError::AlreadyInitialized) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    // ===== Accessors =====

    /// Read-only handle to the challenge store
    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// Subscribe to sync events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn session(&self) -> &PlaybackSession {
        self.controller.session()
    }

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    pub fn now_playing(&self) -> Option<NowPlaying> {
        self.controller.now_playing()
    }

    pub fn adapter(&self) -> &PlaybackAdapter<B> {
        &self.adapter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ===== Session control =====

    /// Start a new session and begin loading its track
    ///
    /// Returns immediately with the new generation; the load resolves in the
    /// background (see [`wait_until_loaded`](Self::wait_until_loaded)).
    pub fn select(&mut self, challenge_id: &str) -> Result<u64> {
        let ticket = {
            let store = self.store.read();
            self.controller.select(&store, challenge_id)?
        };

        let generation = ticket.generation;
        self.latest_generation.store(generation, Ordering::SeqCst);
        self.supersede_pending_plays(generation);
        self.publish_events();
        self.spawn_load(ticket);
        Ok(generation)
    }

    /// Wait for the current session's load to resolve
    ///
    /// Resolutions for superseded sessions are discarded along the way.
    pub async fn wait_until_loaded(&mut self) -> Result<()> {
        while self.controller.state() == SessionState::Loading {
            let Some(resolution) = self.loads_rx.recv().await else {
                return Err(SyncError::EngineStopped);
            };
            match self.apply_load(resolution) {
                Err(e) if e.is_benign() => continue,
                other => other?,
            }
        }
        Ok(())
    }

    /// Select (if needed), wait for the load and start playing
    ///
    /// Playing the active challenge resumes it; playing a completed or
    /// different challenge starts a new session.
    pub async fn play(&mut self, challenge_id: &str) -> Result<()> {
        if self.needs_new_session(challenge_id) {
            self.select(challenge_id)?;
        }
        self.wait_until_loaded().await?;
        self.play_loaded().await
    }

    /// Resume the active session
    pub async fn resume(&mut self) -> Result<()> {
        let generation = self.controller.begin_play()?;
        let outcome = self.adapter.play().await;
        let result = self.controller.resolve_play(generation, outcome);
        self.publish_events();
        result
    }

    pub async fn pause(&mut self) -> Result<()> {
        let generation = self.controller.begin_pause()?;
        let outcome = self.adapter.pause().await;
        let result = self.controller.resolve_pause(generation, outcome);
        self.publish_events();
        result
    }

    /// Seek within the active track, returning the clamped target
    ///
    /// The target is applied as a sample, so seeking to the end completes
    /// the challenge.
    pub async fn seek(&mut self, position_seconds: f64) -> Result<f64> {
        let generation = self.controller.begin_seek()?;
        let outcome = self.adapter.seek(position_seconds).await;
        let target = outcome.as_ref().ok().copied();

        let result = {
            let mut store = self.store.write();
            self.controller.resolve_seek(&mut store, generation, outcome)
        };
        self.publish_events();

        if let Some(commit) = result? {
            self.persist(&commit).await;
        }
        self.stop_if_completed().await;
        Ok(target.unwrap_or(position_seconds))
    }

    /// End the session and clear the backend queue
    pub async fn reset(&mut self) -> Result<()> {
        self.controller.reset();
        let generation = self.controller.generation();
        self.latest_generation.store(generation, Ordering::SeqCst);
        self.supersede_pending_plays(generation);
        self.publish_events();
        self.adapter.reset().await?;
        Ok(())
    }

    /// Tear down the adapter
    pub async fn shutdown(mut self) {
        self.supersede_pending_plays(self.controller.generation() + 1);
        self.adapter.teardown().await;
        info!("Sync engine stopped");
    }

    // ===== Telemetry =====

    /// Poll the adapter once and apply the sample
    ///
    /// No-op unless playing.
    pub async fn tick(&mut self) -> Result<Option<ProgressCommit>> {
        if self.controller.state() != SessionState::Playing {
            return Ok(None);
        }

        let generation = self.controller.generation();
        let sample = self.adapter.get_progress().await;
        self.apply_telemetry(TaggedTelemetry { generation, sample })
            .await
    }

    /// Apply a telemetry sample tagged with the generation it was read under
    pub async fn apply_telemetry(
        &mut self,
        telemetry: TaggedTelemetry,
    ) -> Result<Option<ProgressCommit>> {
        let result = {
            let mut store = self.store.write();
            self.controller.on_telemetry(&mut store, &telemetry)
        };
        self.publish_events();

        let commit = result?;
        if let Some(commit) = &commit {
            self.persist(commit).await;
        }
        self.stop_if_completed().await;
        Ok(commit)
    }

    /// Apply a notification pushed by the backend
    ///
    /// Notifications count for the session whose load finished last; while a
    /// newer selection is still loading they are stale.
    pub async fn handle_backend_event(&mut self, event: BackendEvent) -> Result<()> {
        let generation = self.backend_generation;
        match event {
            BackendEvent::TrackEnded { track_id } => {
                debug!(%track_id, generation, "Backend reported track end");
                let result = {
                    let mut store = self.store.write();
                    self.controller
                        .on_track_ended(&mut store, generation, &track_id)
                };
                self.publish_events();
                if let Some(commit) = result? {
                    self.persist(&commit).await;
                }
                self.stop_if_completed().await;
            }
            BackendEvent::PlaybackStateChanged { playing } => {
                let result = self.controller.on_backend_playing(generation, playing);
                if result.is_ok() {
                    self.adapter.set_playing(playing);
                }
                self.publish_events();
                result?;
            }
            BackendEvent::ActiveTrackChanged { track_id } => {
                debug!(?track_id, generation, "Backend active track changed");
                let result = self
                    .controller
                    .on_active_track_changed(generation, track_id.as_ref());
                self.publish_events();
                result?;
            }
        }
        Ok(())
    }

    // ===== Task mode =====

    /// Move the engine onto a task
    ///
    /// The engine stops once every [`EngineHandle`] is dropped.
    pub fn spawn(self) -> (EngineHandle, JoinHandle<()>) {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(self.run(receiver));
        (EngineHandle { commands }, task)
    }

    /// Run the event loop until the command channel closes
    pub async fn run(mut self, mut commands: mpsc::Receiver<EngineCommand>) {
        let mut telemetry = tokio::time::interval(self.config.telemetry_interval());
        telemetry.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut backend_events = self.adapter.subscribe();

        info!(
            telemetry_interval_ms = self.config.telemetry_interval_ms,
            "Sync engine running"
        );

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(resolution) = self.loads_rx.recv() => {
                    if resolution.generation == self.controller.generation() {
                        discard_buffered_events(&mut backend_events);
                    }
                    self.on_load_resolution(resolution).await;
                }
                _ = telemetry.tick() => {
                    if let Err(e) = self.tick().await {
                        log_failure("Telemetry tick", &e);
                    }
                }
                Some(event) = next_backend_event(&mut backend_events) => {
                    if let Err(e) = self.handle_backend_event(event).await {
                        log_failure("Backend event", &e);
                    }
                }
            }
        }

        self.shutdown().await;
    }

    async fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Play { challenge_id, reply } => {
                self.handle_play(challenge_id, reply).await;
            }
            EngineCommand::Resume { reply } => {
                let _ = reply.send(self.resume().await);
            }
            EngineCommand::Pause { reply } => {
                let _ = reply.send(self.pause().await);
            }
            EngineCommand::Seek {
                position_seconds,
                reply,
            } => {
                let _ = reply.send(self.seek(position_seconds).await);
            }
            EngineCommand::Reset { reply } => {
                let _ = reply.send(self.reset().await);
            }
            EngineCommand::Session { reply } => {
                let _ = reply.send(self.controller.session().clone());
            }
        }
    }

    /// Play without blocking the loop on the load
    async fn handle_play(&mut self, challenge_id: ChallengeId, reply: oneshot::Sender<Result<()>>) {
        let loading_same = self.state() == SessionState::Loading
            && self.controller.active_challenge_id() == Some(&challenge_id);

        if loading_same {
            self.pending_plays.push(PendingPlay {
                generation: self.controller.generation(),
                reply,
            });
        } else if self.needs_new_session(challenge_id.as_str()) {
            match self.select(challenge_id.as_str()) {
                Ok(generation) => self.pending_plays.push(PendingPlay { generation, reply }),
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            }
        } else {
            let _ = reply.send(self.play_loaded().await);
        }
    }

    async fn on_load_resolution(&mut self, resolution: LoadResolution) {
        let generation = resolution.generation;
        let result = self.apply_load(resolution);

        let waiting = self
            .pending_plays
            .iter()
            .any(|pending| pending.generation == generation);

        match (waiting, result) {
            (true, result) => {
                let outcome = match result {
                    Ok(()) => self.play_loaded().await,
                    Err(e) => Err(e),
                };
                let (ready, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_plays)
                    .into_iter()
                    .partition(|pending| pending.generation == generation);
                self.pending_plays = rest;
                for pending in ready {
                    let _ = pending.reply.send(outcome.clone());
                }
            }
            (false, Err(e)) => log_failure("Load", &e),
            (false, Ok(())) => {}
        }
    }

    // ===== Internals =====

    fn needs_new_session(&self, challenge_id: &str) -> bool {
        let is_active = self
            .controller
            .active_challenge_id()
            .is_some_and(|id| id.as_str() == challenge_id);
        !is_active
            || self.controller.track_replaced()
            || matches!(self.state(), SessionState::Idle | SessionState::Completed)
    }

    async fn play_loaded(&mut self) -> Result<()> {
        if self.state() == SessionState::Playing {
            return Ok(());
        }
        self.resume().await
    }

    fn apply_load(&mut self, resolution: LoadResolution) -> Result<()> {
        let generation = resolution.generation;
        let result = self.controller.resolve_load(generation, resolution.outcome);
        if result.is_ok() {
            self.backend_generation = generation;
        }
        self.publish_events();
        result
    }

    /// Pause the backend once the session completed with audio still running
    async fn stop_if_completed(&mut self) {
        let session = self.controller.session();
        if session.state == SessionState::Completed && session.is_playing {
            if let Err(e) = self.pause().await {
                log_failure("Stop after completion", &e);
            }
        }
    }

    fn spawn_load(&self, ticket: LoadTicket) {
        let adapter = Arc::clone(&self.adapter);
        let latest = Arc::clone(&self.latest_generation);
        let resolutions = self.loads_tx.clone();

        tokio::spawn(async move {
            let LoadTicket { generation, track } = ticket;
            let outcome = match adapter.load_for_session(&track, generation, &latest).await {
                Ok(true) => Ok(()),
                Ok(false) => return,
                Err(e) => Err(e),
            };
            let _ = resolutions.send(LoadResolution {
                generation,
                outcome,
            });
        });
    }

    fn supersede_pending_plays(&mut self, current: u64) {
        for pending in self.pending_plays.drain(..) {
            let _ = pending.reply.send(Err(StateError::StaleGeneration {
                current,
                received: pending.generation,
            }
            .into()));
        }
    }

    async fn persist(&self, commit: &ProgressCommit) {
        if let Err(e) = self
            .progress_store
            .save(&commit.challenge_id, commit.record)
            .await
        {
            warn!(
                challenge_id = %commit.challenge_id,
                "Failed to persist progress: {}", e
            );
        }
    }

    fn publish_events(&mut self) {
        for event in self.controller.drain_events() {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }
}

fn log_failure(context: &str, error: &SyncError) {
    if error.is_benign() {
        debug!("{} skipped: {}", context, error);
    } else {
        warn!("{} failed: {}", context, error);
    }
}

/// Drop notifications queued before the current load finished; they belong
/// to the session it replaced
fn discard_buffered_events(receiver: &mut Option<broadcast::Receiver<BackendEvent>>) {
    let Some(events) = receiver else {
        return;
    };

    loop {
        match events.try_recv() {
            Ok(event) => debug!(?event, "Dropping backend event from before the load"),
            Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

async fn next_backend_event(
    receiver: &mut Option<broadcast::Receiver<BackendEvent>>,
) -> Option<BackendEvent> {
    let Some(events) = receiver else {
        return std::future::pending().await;
    };

    loop {
        match events.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Backend event stream lagged");
            }
            Err(RecvError::Closed) => {
                *receiver = None;
                return std::future::pending().await;
            }
        }
    }
}

/// Commands accepted by a running engine
#[derive(Debug)]
pub enum EngineCommand {
    Play {
        challenge_id: ChallengeId,
        reply: oneshot::Sender<Result<()>>,
    },
    Resume {
        reply: oneshot::Sender<Result<()>>,
    },
    Pause {
        reply: oneshot::Sender<Result<()>>,
    },
    Seek {
        position_seconds: f64,
        reply: oneshot::Sender<Result<f64>>,
    },
    Reset {
        reply: oneshot::Sender<Result<()>>,
    },
    Session {
        reply: oneshot::Sender<PlaybackSession>,
    },
}

/// Cloneable control handle for a spawned engine
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    /// Play a challenge, resolving once playback started or failed
    ///
    /// If another play supersedes this one before its load resolves, the
    /// result is a benign `StaleGeneration` error.
    pub async fn play(&self, challenge_id: impl Into<ChallengeId>) -> Result<()> {
        let challenge_id = challenge_id.into();
        self.request(|reply| EngineCommand::Play {
            challenge_id,
            reply,
        })
        .await?
    }

    pub async fn resume(&self) -> Result<()> {
        self.request(|reply| EngineCommand::Resume { reply }).await?
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| EngineCommand::Pause { reply }).await?
    }

    pub async fn seek(&self, position_seconds: f64) -> Result<f64> {
        self.request(|reply| EngineCommand::Seek {
            position_seconds,
            reply,
        })
        .await?
    }

    pub async fn reset(&self) -> Result<()> {
        self.request(|reply| EngineCommand::Reset { reply }).await?
    }

    /// Snapshot of the current session
    pub async fn session(&self) -> Result<PlaybackSession> {
        self.request(|reply| EngineCommand::Session { reply }).await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| SyncError::EngineStopped)?;
        response.await.map_err(|_| SyncError::EngineStopped)
    }
}
