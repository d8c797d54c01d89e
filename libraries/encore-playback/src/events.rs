//! Sync Events
//!
//! Event-based communication for UI synchronization. Events are emitted at
//! key points:
//! - Session lifecycle (selection, state changes)
//! - Play head movement (every applied sample)
//! - Progress commits and completion
//! - Statistics and achievement changes

use crate::error::ErrorReport;
use crate::types::SessionState;
use encore_core::{AchievementSet, ChallengeId, UserStats};
use serde::{Deserialize, Serialize};

/// Events emitted by the sync engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncEvent {
    /// Session state changed
    StateChanged { state: SessionState },

    /// A challenge was selected and a new session began
    SessionStarted {
        challenge_id: ChallengeId,
        generation: u64,
    },

    /// A telemetry or seek sample was applied
    PositionUpdated {
        position_seconds: f64,
        duration_seconds: f64,
    },

    /// A challenge's stored progress changed
    ProgressUpdated {
        challenge_id: ChallengeId,
        progress: f64,
    },

    /// A challenge became completed; emitted once per challenge
    ChallengeCompleted {
        challenge_id: ChallengeId,
        points_awarded: u32,
    },

    /// Aggregates changed after a progress commit
    StatsChanged {
        total_points: u64,
        completed_count: usize,
        completion_rate: f64,
        achievements: AchievementSet,
    },

    /// A user-visible failure
    Error { report: ErrorReport },
}

impl SyncEvent {
    pub(crate) fn stats_changed(stats: &UserStats) -> Self {
        Self::StatsChanged {
            total_points: stats.total_points,
            completed_count: stats.completed_count(),
            completion_rate: stats.completion_rate(),
            achievements: encore_core::achievements::evaluate(stats),
        }
    }
}
