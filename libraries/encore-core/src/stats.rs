//! Aggregated user statistics
//!
//! Always derived from the catalog, never stored, so they cannot drift from
//! the challenge records.

use crate::types::{Challenge, ChallengeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Derived user statistics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserStats {
    /// Sum of points over completed challenges
    pub total_points: u64,

    /// Ids of completed challenges
    pub completed_challenge_ids: BTreeSet<ChallengeId>,

    /// Number of challenges in the catalog
    pub total_challenges: usize,
}

impl UserStats {
    /// Aggregate statistics over a set of challenges
    pub fn from_challenges<'a>(challenges: impl IntoIterator<Item = &'a Challenge>) -> Self {
        let mut stats = Self::default();

        for challenge in challenges {
            stats.total_challenges += 1;
            if challenge.completed {
                stats.total_points += u64::from(challenge.points);
                stats.completed_challenge_ids.insert(challenge.id.clone());
            }
        }

        stats
    }

    /// Number of completed challenges
    pub fn completed_count(&self) -> usize {
        self.completed_challenge_ids.len()
    }

    /// Percentage of challenges completed, 0 for an empty catalog
    pub fn completion_rate(&self) -> f64 {
        if self.total_challenges == 0 {
            return 0.0;
        }
        self.completed_count() as f64 / self.total_challenges as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Difficulty;

    fn completed(id: &str, points: u32) -> Challenge {
        let mut c = Challenge::new(id, "T", "A", Difficulty::Medium, 120.0, points);
        c.progress = 100.0;
        c.completed = true;
        c
    }

    #[test]
    fn empty_catalog_has_zero_rate() {
        let stats = UserStats::from_challenges(&[]);
        assert_eq!(stats.total_points, 0);
        assert_eq!(stats.completion_rate(), 0.0);
    }

    #[test]
    fn sums_points_of_completed_only() {
        let pending = Challenge::new("c3", "T", "A", Difficulty::Easy, 60.0, 500);
        let challenges = vec![completed("c1", 50), completed("c2", 75), pending];

        let stats = UserStats::from_challenges(&challenges);
        assert_eq!(stats.total_points, 125);
        assert_eq!(stats.completed_count(), 2);
        assert_eq!(stats.total_challenges, 3);
        assert!((stats.completion_rate() - 66.666_666).abs() < 0.001);
    }
}
