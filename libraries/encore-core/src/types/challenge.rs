/// Challenge types
use super::ids::ChallengeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Challenge difficulty
///
/// Affects display only, never progress or scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Uppercase badge label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
        }
    }

    /// Badge icon
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Easy => "🎧",
            Self::Medium => "⚡",
            Self::Hard => "🔥",
        }
    }

    /// Convert to the lowercase catalog representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.icon(), self.label())
    }
}

/// A playable music challenge
///
/// Display metadata, duration and points are immutable once the catalog is
/// built. Only `progress` and `completed` change, and only through the
/// progress rules in [`crate::progress`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub description: String,
    /// Audio location handed to the playback backend
    #[serde(default)]
    pub url: String,
    pub difficulty: Difficulty,
    /// Track length in seconds, always > 0 in a validated catalog
    #[serde(alias = "duration")]
    pub duration_seconds: f64,
    /// Reward for completing the challenge
    pub points: u32,
    /// Percentage played, clamped to [0, 100]
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub completed: bool,
}

impl Challenge {
    /// Create a challenge with no progress
    pub fn new(
        id: impl Into<ChallengeId>,
        title: impl Into<String>,
        artist: impl Into<String>,
        difficulty: Difficulty,
        duration_seconds: f64,
        points: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            description: String::new(),
            url: String::new(),
            difficulty,
            duration_seconds,
            points,
            progress: 0.0,
            completed: false,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the audio location
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Snapshot of the persisted part of this challenge
    pub fn progress_record(&self) -> ProgressRecord {
        ProgressRecord {
            progress: self.progress,
            completed: self.completed,
        }
    }
}

/// Persisted progress for one challenge
///
/// This is the storage layout the core depends on: a map from challenge id
/// to this record, loaded at startup and written back on every commit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub progress: f64,
    pub completed: bool,
}

impl ProgressRecord {
    /// Bring a record loaded from storage back inside the model invariants
    ///
    /// Progress is clamped to [0, 100] (non-finite values become 0) and a
    /// completed record is pinned to 100.
    pub fn normalized(self) -> Self {
        let progress = if self.progress.is_finite() {
            self.progress.clamp(0.0, 100.0)
        } else {
            0.0
        };

        if self.completed || progress >= 100.0 {
            Self {
                progress: 100.0,
                completed: true,
            }
        } else {
            Self {
                progress,
                completed: false,
            }
        }
    }

    /// Combine two records without losing credit from either
    pub fn merge(self, other: Self) -> Self {
        let a = self.normalized();
        let b = other.normalized();
        Self {
            progress: a.progress.max(b.progress),
            completed: a.completed || b.completed,
        }
        .normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_deserializes_catalog_entry() {
        let json = r#"{
            "id": "c1",
            "title": "Bohemian Rhapsody",
            "artist": "Queen",
            "difficulty": "hard",
            "duration": 354,
            "points": 150
        }"#;

        let challenge: Challenge = serde_json::from_str(json).unwrap();
        assert_eq!(challenge.id.as_str(), "c1");
        assert_eq!(challenge.difficulty, Difficulty::Hard);
        assert_eq!(challenge.duration_seconds, 354.0);
        assert_eq!(challenge.progress, 0.0);
        assert!(!challenge.completed);
    }

    #[test]
    fn difficulty_labels() {
        assert_eq!(Difficulty::Easy.to_string(), "🎧 EASY");
        assert_eq!(Difficulty::Medium.label(), "MEDIUM");
        assert_eq!(Difficulty::Hard.as_str(), "hard");
    }

    #[test]
    fn normalized_record_pins_completed_to_100() {
        let record = ProgressRecord {
            progress: 42.0,
            completed: true,
        }
        .normalized();
        assert_eq!(record.progress, 100.0);
        assert!(record.completed);
    }

    #[test]
    fn normalized_record_clamps_out_of_range_values() {
        let high = ProgressRecord {
            progress: 250.0,
            completed: false,
        }
        .normalized();
        assert_eq!(high.progress, 100.0);
        assert!(high.completed);

        let low = ProgressRecord {
            progress: -3.0,
            completed: false,
        }
        .normalized();
        assert_eq!(low.progress, 0.0);

        let nan = ProgressRecord {
            progress: f64::NAN,
            completed: false,
        }
        .normalized();
        assert_eq!(nan.progress, 0.0);
        assert!(!nan.completed);
    }

    #[test]
    fn merge_keeps_best_of_both() {
        let stored = ProgressRecord {
            progress: 70.0,
            completed: false,
        };
        let stale = ProgressRecord {
            progress: 20.0,
            completed: false,
        };
        assert_eq!(stored.merge(stale).progress, 70.0);

        let done = ProgressRecord {
            progress: 100.0,
            completed: true,
        };
        assert_eq!(stale.merge(done), done);
        assert_eq!(done.merge(stale), done);
    }
}
