//! Property-based tests for the progress model and achievements
//!
//! Uses proptest to verify invariants across many random telemetry
//! sequences.

use encore_core::{
    achievements, apply_progress, compute_progress, Challenge, ChallengeId, Difficulty, UserStats,
};
use proptest::prelude::*;

// ===== Helpers =====

fn arbitrary_challenge() -> impl Strategy<Value = Challenge> {
    (1u32..900, 0u32..500).prop_map(|(duration, points)| {
        Challenge::new("c1", "Title", "Artist", Difficulty::Medium, f64::from(duration), points)
    })
}

/// (position, adapter duration) pairs, including seeks backwards, zero
/// durations and positions past the end
fn arbitrary_telemetry() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((-60.0f64..1200.0, prop_oneof![Just(0.0), 1.0f64..900.0]), 1..60)
}

fn arbitrary_stats() -> impl Strategy<Value = UserStats> {
    (0u64..400, prop::collection::btree_set("[a-z]{1,4}", 0..8), 0usize..10).prop_map(
        |(total_points, ids, extra)| {
            let completed_challenge_ids: std::collections::BTreeSet<ChallengeId> =
                ids.into_iter().map(ChallengeId::new).collect();
            let total_challenges = completed_challenge_ids.len() + extra;
            UserStats {
                total_points,
                completed_challenge_ids,
                total_challenges,
            }
        },
    )
}

// ===== Property Tests =====

proptest! {
    /// Property: progress stays in [0, 100] after any telemetry sequence
    #[test]
    fn progress_stays_in_bounds(challenge in arbitrary_challenge(), samples in arbitrary_telemetry()) {
        let mut c = challenge;
        for (position, duration) in samples {
            let p = compute_progress(&c, position, duration);
            prop_assert!((0.0..=100.0).contains(&p), "computed progress out of range: {}", p);
            c = apply_progress(&c, p);
            prop_assert!((0.0..=100.0).contains(&c.progress), "stored progress out of range: {}", c.progress);
        }
    }

    /// Property: progress never decreases, whatever the telemetry does
    #[test]
    fn progress_is_monotonic(challenge in arbitrary_challenge(), samples in arbitrary_telemetry()) {
        let mut c = challenge;
        let mut last = c.progress;
        for (position, duration) in samples {
            c = apply_progress(&c, compute_progress(&c, position, duration));
            prop_assert!(c.progress >= last, "progress regressed from {} to {}", last, c.progress);
            last = c.progress;
        }
    }

    /// Property: completed implies 100, and completion never reverts
    #[test]
    fn completion_is_sticky_and_pinned(challenge in arbitrary_challenge(), samples in arbitrary_telemetry()) {
        let mut c = challenge;
        let mut was_completed = false;
        for (position, duration) in samples {
            c = apply_progress(&c, compute_progress(&c, position, duration));
            if c.completed {
                prop_assert_eq!(c.progress, 100.0);
            }
            if was_completed {
                prop_assert!(c.completed, "completion reverted");
            }
            was_completed = c.completed;
        }
    }

    /// Property: achievement derivation is a pure function of the stats
    #[test]
    fn achievements_are_pure(stats in arbitrary_stats()) {
        let first = achievements::evaluate(&stats);
        let second = achievements::evaluate(&stats.clone());
        prop_assert_eq!(first, second);
    }

    /// Property: the empty-state marker and unlocked achievements agree
    #[test]
    fn empty_state_consistent(stats in arbitrary_stats()) {
        let set = achievements::evaluate(&stats);
        if set.empty_state {
            prop_assert_eq!(stats.total_points, 0);
            prop_assert!(stats.completed_challenge_ids.is_empty());
            prop_assert!(set.unlocked.is_empty());
        }
    }
}

// ===== Scenarios =====

#[test]
fn half_then_full_playback_of_three_minute_challenge() {
    let c = Challenge::new("c1", "Title", "Artist", Difficulty::Easy, 180.0, 50);

    let c = apply_progress(&c, compute_progress(&c, 90.0, 180.0));
    assert_eq!(c.progress, 50.0);
    assert!(!c.completed);

    let c = apply_progress(&c, compute_progress(&c, 180.0, 180.0));
    assert_eq!(c.progress, 100.0);
    assert!(c.completed);

    let stats = UserStats::from_challenges(std::iter::once(&c));
    assert_eq!(stats.total_points, 50);

    // Replaying the same tick changes nothing
    let replayed = apply_progress(&c, compute_progress(&c, 180.0, 180.0));
    assert_eq!(replayed, c);
    assert_eq!(UserStats::from_challenges(std::iter::once(&replayed)).total_points, 50);
}

#[test]
fn empty_catalog_has_no_perfect_score() {
    let stats = UserStats::from_challenges(std::iter::empty());
    assert_eq!(stats.completion_rate(), 0.0);
    assert!(!achievements::evaluate(&stats).contains(encore_core::Achievement::PerfectScore));
}
