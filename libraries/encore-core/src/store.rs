//! Challenge catalog store
//!
//! Owns the challenge records for the lifetime of the process. Progress is
//! mutated only through [`ChallengeStore::apply_progress`], which enforces
//! the progress rules; everything else is read-only.

use crate::error::{CoreError, Result};
use crate::progress::{self, ProgressChange};
use crate::types::{Challenge, ChallengeId, ProgressRecord};
use std::collections::HashMap;

/// In-memory catalog of challenges, in display order
#[derive(Debug, Clone, Default)]
pub struct ChallengeStore {
    challenges: Vec<Challenge>,
    index: HashMap<ChallengeId, usize>,
}

impl ChallengeStore {
    /// Build a validated store
    ///
    /// Rejects duplicate ids and non-positive durations. Any progress carried
    /// by the input records is normalized.
    pub fn new(challenges: Vec<Challenge>) -> Result<Self> {
        let mut index = HashMap::with_capacity(challenges.len());
        let mut validated = Vec::with_capacity(challenges.len());

        for (position, mut challenge) in challenges.into_iter().enumerate() {
            if !challenge.duration_seconds.is_finite() || challenge.duration_seconds <= 0.0 {
                return Err(CoreError::InvalidDuration {
                    id: challenge.id,
                    duration_seconds: challenge.duration_seconds,
                });
            }

            if index.insert(challenge.id.clone(), position).is_some() {
                return Err(CoreError::DuplicateChallenge(challenge.id));
            }

            let record = challenge.progress_record().normalized();
            challenge.progress = record.progress;
            challenge.completed = record.completed;
            validated.push(challenge);
        }

        Ok(Self {
            challenges: validated,
            index,
        })
    }

    /// Parse and validate a JSON array of challenges
    pub fn from_json(json: &str) -> Result<Self> {
        let challenges: Vec<Challenge> = serde_json::from_str(json)?;
        Self::new(challenges)
    }

    /// Overlay persisted progress onto the catalog
    ///
    /// Records for ids that are no longer in the catalog are skipped.
    /// Returns the number of records applied.
    pub fn seed_progress(
        &mut self,
        records: impl IntoIterator<Item = (ChallengeId, ProgressRecord)>,
    ) -> usize {
        let mut applied = 0;

        for (id, record) in records {
            if let Some(&position) = self.index.get(&id) {
                let record = record.normalized();
                let challenge = &mut self.challenges[position];
                challenge.progress = record.progress;
                challenge.completed = record.completed;
                applied += 1;
            }
        }

        applied
    }

    /// Apply a progress value to a challenge through the progress rules
    pub fn apply_progress(&mut self, id: &str, new_progress: f64) -> Result<ProgressChange> {
        let position = *self.index.get(id).ok_or_else(|| CoreError::not_found(id))?;
        Ok(progress::apply_progress_in_place(
            &mut self.challenges[position],
            new_progress,
        ))
    }

    /// Get a challenge by id
    pub fn get(&self, id: &str) -> Option<&Challenge> {
        self.index.get(id).map(|&position| &self.challenges[position])
    }

    /// Whether the catalog contains an id
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All challenges in display order
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    /// Number of challenges
    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }

    /// Snapshot of every challenge's persisted state
    pub fn progress_records(&self) -> HashMap<ChallengeId, ProgressRecord> {
        self.challenges
            .iter()
            .map(|c| (c.id.clone(), c.progress_record()))
            .collect()
    }
}
