//! Achievement evaluation
//!
//! A stateless projection of [`UserStats`]. Nothing here is cached: callers
//! re-evaluate whenever the stats change.

use crate::stats::UserStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Points needed for [`Achievement::FirstHundredPoints`]
pub const FIRST_HUNDRED_POINTS: u64 = 100;

/// Guidance shown when nothing has been earned yet
pub const EMPTY_STATE_HINT: &str = "Complete challenges to unlock achievements!";

/// An unlockable achievement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Achievement {
    /// Earned at least 100 points
    FirstHundredPoints,
    /// Completed at least one challenge
    MusicLover,
    /// Completed every challenge in a non-empty catalog
    PerfectScore,
}

impl Achievement {
    /// Display title
    pub fn title(&self) -> &'static str {
        match self {
            Self::FirstHundredPoints => "First 100 Points",
            Self::MusicLover => "Music Lover",
            Self::PerfectScore => "Perfect Score",
        }
    }

    /// Display icon
    pub fn icon(&self) -> &'static str {
        match self {
            Self::FirstHundredPoints => "🏆",
            Self::MusicLover => "🎵",
            Self::PerfectScore => "🌟",
        }
    }
}

/// Result of evaluating achievements
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AchievementSet {
    pub unlocked: BTreeSet<Achievement>,

    /// Set when the user has no points and no completions; the UI renders
    /// [`EMPTY_STATE_HINT`] instead of an achievement list
    pub empty_state: bool,
}

impl AchievementSet {
    /// Whether a given achievement is unlocked
    pub fn contains(&self, achievement: Achievement) -> bool {
        self.unlocked.contains(&achievement)
    }

    /// Guidance text for the empty state, if applicable
    pub fn hint(&self) -> Option<&'static str> {
        self.empty_state.then_some(EMPTY_STATE_HINT)
    }
}

/// Derive the unlocked achievements from user statistics
pub fn evaluate(stats: &UserStats) -> AchievementSet {
    let mut unlocked = BTreeSet::new();

    if stats.total_points >= FIRST_HUNDRED_POINTS {
        unlocked.insert(Achievement::FirstHundredPoints);
    }

    if stats.completed_count() >= 1 {
        unlocked.insert(Achievement::MusicLover);
    }

    // An empty catalog never counts as a perfect score
    if stats.total_challenges > 0 && stats.completion_rate() >= 100.0 {
        unlocked.insert(Achievement::PerfectScore);
    }

    AchievementSet {
        unlocked,
        empty_state: stats.total_points == 0 && stats.completed_count() == 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChallengeId;

    fn stats(points: u64, completed: &[&str], total: usize) -> UserStats {
        UserStats {
            total_points: points,
            completed_challenge_ids: completed.iter().map(|id| ChallengeId::new(*id)).collect(),
            total_challenges: total,
        }
    }

    #[test]
    fn nothing_earned_shows_empty_state() {
        let set = evaluate(&stats(0, &[], 3));
        assert!(set.unlocked.is_empty());
        assert!(set.empty_state);
        assert_eq!(set.hint(), Some(EMPTY_STATE_HINT));
    }

    #[test]
    fn one_completion_unlocks_music_lover() {
        let set = evaluate(&stats(50, &["c1"], 3));
        assert!(set.contains(Achievement::MusicLover));
        assert!(!set.contains(Achievement::FirstHundredPoints));
        assert!(!set.contains(Achievement::PerfectScore));
        assert!(!set.empty_state);
    }

    #[test]
    fn hundred_points_threshold_is_inclusive() {
        let set = evaluate(&stats(100, &["c1", "c2"], 5));
        assert!(set.contains(Achievement::FirstHundredPoints));
    }

    #[test]
    fn all_completed_is_perfect_score() {
        let set = evaluate(&stats(150, &["c1", "c2"], 2));
        assert_eq!(set.unlocked.len(), 3);
    }

    #[test]
    fn empty_catalog_is_not_perfect() {
        let set = evaluate(&stats(0, &[], 0));
        assert!(!set.contains(Achievement::PerfectScore));
        assert!(set.empty_state);
    }

    #[test]
    fn zero_point_completion_is_not_empty_state() {
        let set = evaluate(&stats(0, &["free"], 4));
        assert!(set.contains(Achievement::MusicLover));
        assert!(!set.empty_state);
    }
}
