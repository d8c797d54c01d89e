//! Encore - Playback Synchronization
//!
//! Keeps challenge progress in step with what the audio backend is actually
//! playing.
//!
//! This crate provides:
//! - A timeout-bounded adapter over a platform playback backend
//! - A session state machine (`Idle → Loading → Ready → Playing ⇄ Paused →
//!   Completed`) with generation tagging, so late results from a superseded
//!   selection never touch the current session
//! - An async engine that polls telemetry, applies backend notifications and
//!   persists every progress commit
//! - A simulated backend for tests and the CLI
//!
//! # Architecture
//!
//! `encore-playback` does not depend on a concrete audio service or on
//! `encore-storage`:
//! - Audio output is provided through the [`PlaybackBackend`] trait
//! - Persistence goes through `encore_core::ProgressStore`
//!
//! # Example
//!
//! ```rust,no_run
//! use encore_core::{sample::sample_challenges, ChallengeStore, ProgressStore};
//! use encore_playback::{EngineConfig, SimulatedBackend, SyncEngine};
//! use std::sync::Arc;
//!
//! # async fn example(progress_store: Arc<dyn ProgressStore>) -> encore_playback::Result<()> {
//! let catalog = ChallengeStore::new(sample_challenges())?;
//! let mut engine = SyncEngine::bootstrap(
//!     SimulatedBackend::new(),
//!     catalog,
//!     progress_store,
//!     EngineConfig::default(),
//! )
//! .await?;
//!
//! engine.play("1").await?;
//! engine.seek(90.0).await?;
//! assert_eq!(engine.store().challenge("1").unwrap().progress, 50.0);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod adapter;
pub mod backend;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod shared;
pub mod simulated;
pub mod types;

pub use adapter::PlaybackAdapter;
pub use backend::{BackendError, BackendEvent, PlaybackBackend};
pub use controller::{LoadTicket, ProgressCommit, SyncController};
pub use engine::{EngineCommand, EngineHandle, SyncEngine};
pub use error::{ErrorReport, PlaybackError, Result, StateError, SyncError, TelemetryError};
pub use events::SyncEvent;
pub use shared::SharedStore;
pub use simulated::{Operation, SimulatedBackend};
pub use types::{
    AppKilledPlaybackBehavior, BackendProgress, Capability, EngineConfig, PlaybackSession,
    PlayerOptions, RepeatMode, SessionState, TaggedTelemetry, TelemetrySample, Track,
};
