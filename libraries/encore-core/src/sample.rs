//! Built-in catalog used when no catalog file is configured
use crate::types::{Challenge, Difficulty};

/// Sample challenges with no progress
pub fn sample_challenges() -> Vec<Challenge> {
    vec![
        Challenge::new("1", "Midnight Groove", "The Night Owls", Difficulty::Easy, 180.0, 50)
            .with_description("Ease in with a laid-back bassline and steady backbeat.")
            .with_url("https://cdn.encore.app/tracks/midnight-groove.mp3"),
        Challenge::new("2", "Electric Dreams", "Neon Pulse", Difficulty::Medium, 240.0, 100)
            .with_description("Follow the synth leads through three tempo changes.")
            .with_url("https://cdn.encore.app/tracks/electric-dreams.mp3"),
        Challenge::new("3", "Symphony of Chaos", "Orchestra X", Difficulty::Hard, 300.0, 200)
            .with_description("A full orchestral piece with shifting time signatures.")
            .with_url("https://cdn.encore.app/tracks/symphony-of-chaos.mp3"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ChallengeStore;

    #[test]
    fn sample_catalog_is_valid() {
        let store = ChallengeStore::new(sample_challenges()).unwrap();
        assert_eq!(store.len(), 3);
        assert!(store.challenges().iter().all(|c| !c.completed));
    }
}
