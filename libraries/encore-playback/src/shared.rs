//! Shared challenge store
//!
//! Readers (UI, CLI) get snapshots through selectors; only the sync engine
//! writes, and only through the progress rules.

use encore_core::selectors::{self, ChallengeCard, NowPlaying};
use encore_core::{AchievementSet, Challenge, ChallengeStore, UserStats};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cloneable handle to the process-wide challenge store
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<RwLock<ChallengeStore>>,
}

impl SharedStore {
    pub fn new(store: ChallengeStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Read access to the underlying store
    pub fn read(&self) -> RwLockReadGuard<'_, ChallengeStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ChallengeStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn challenges(&self) -> Vec<Challenge> {
        selectors::select_challenges(&self.read()).to_vec()
    }

    pub fn challenge(&self, id: &str) -> Option<Challenge> {
        selectors::select_challenge(&self.read(), id).cloned()
    }

    pub fn total_points(&self) -> u64 {
        selectors::select_total_points(&self.read())
    }

    pub fn completed_challenges(&self) -> Vec<Challenge> {
        selectors::select_completed_challenges(&self.read())
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn completion_rate(&self) -> f64 {
        selectors::select_completion_rate(&self.read())
    }

    pub fn user_stats(&self) -> UserStats {
        selectors::select_user_stats(&self.read())
    }

    pub fn achievements(&self) -> AchievementSet {
        selectors::select_achievements(&self.read())
    }

    /// Display cards for every challenge
    pub fn cards(&self, now_playing: Option<&NowPlaying>) -> Vec<ChallengeCard> {
        selectors::select_cards(&self.read(), now_playing)
    }
}
