//! Progress model
//!
//! Pure update rules turning a telemetry sample into challenge progress.
//!
//! Progress is monotonic: scrubbing backwards to replay a section, or a late
//! telemetry sample, never takes away credit that was already earned.
//! Completion is sticky and always coincides with progress pinned at 100.

use crate::types::{Challenge, ProgressRecord};

/// Upper bound of the progress scale
pub const MAX_PROGRESS: f64 = 100.0;

/// Compute the percentage played for a telemetry sample
///
/// `duration_seconds` is the adapter-reported duration. When it is zero or
/// unavailable the challenge's own duration is used instead. If neither is
/// usable the challenge's last known progress is returned unchanged.
pub fn compute_progress(challenge: &Challenge, position_seconds: f64, duration_seconds: f64) -> f64 {
    let effective_duration = if duration_seconds > 0.0 {
        duration_seconds
    } else {
        challenge.duration_seconds
    };

    if effective_duration.is_nan() || effective_duration <= 0.0 {
        return challenge.progress;
    }

    let percent = position_seconds / effective_duration * MAX_PROGRESS;
    if !percent.is_finite() {
        return challenge.progress;
    }

    percent.clamp(0.0, MAX_PROGRESS)
}

/// Apply a newly computed progress value, returning the updated record
///
/// The result keeps the larger of the old and new progress, and becomes
/// completed once it reaches 100. A completed challenge stays completed.
pub fn apply_progress(challenge: &Challenge, new_progress: f64) -> Challenge {
    let mut updated = challenge.clone();
    apply_progress_in_place(&mut updated, new_progress);
    updated
}

/// In-place variant of [`apply_progress`] reporting what changed
pub fn apply_progress_in_place(challenge: &mut Challenge, new_progress: f64) -> ProgressChange {
    let previous = challenge.progress_record();

    let candidate = if new_progress.is_finite() {
        new_progress.clamp(0.0, MAX_PROGRESS)
    } else {
        challenge.progress
    };

    let mut progress = challenge.progress.max(candidate).clamp(0.0, MAX_PROGRESS);
    let completed = challenge.completed || progress >= MAX_PROGRESS;
    if completed {
        progress = MAX_PROGRESS;
    }

    challenge.progress = progress;
    challenge.completed = completed;

    ProgressChange {
        previous,
        current: challenge.progress_record(),
    }
}

/// Outcome of applying progress to a challenge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressChange {
    pub previous: ProgressRecord,
    pub current: ProgressRecord,
}

impl ProgressChange {
    /// Whether the record differs from before
    pub fn is_changed(&self) -> bool {
        self.previous != self.current
    }

    /// Whether this application flipped `completed` from false to true
    ///
    /// This is the guard for awarding points: it is true at most once per
    /// challenge.
    pub fn newly_completed(&self) -> bool {
        !self.previous.completed && self.current.completed
    }
}
