//! Selection/query layer
//!
//! Read-only views over a [`ChallengeStore`]. Every selector recomputes from
//! the store it is given, so the result always reflects the latest commit.

use crate::achievements::{self, AchievementSet};
use crate::stats::UserStats;
use crate::store::ChallengeStore;
use crate::types::{Challenge, ChallengeId};
use serde::{Deserialize, Serialize};

/// All challenges in display order
pub fn select_challenges(store: &ChallengeStore) -> &[Challenge] {
    store.challenges()
}

/// A single challenge
pub fn select_challenge<'a>(store: &'a ChallengeStore, id: &str) -> Option<&'a Challenge> {
    store.get(id)
}

/// Total points earned
pub fn select_total_points(store: &ChallengeStore) -> u64 {
    select_user_stats(store).total_points
}

/// Completed challenges in display order
pub fn select_completed_challenges(store: &ChallengeStore) -> Vec<&Challenge> {
    store.challenges().iter().filter(|c| c.completed).collect()
}

/// Percentage of challenges completed
pub fn select_completion_rate(store: &ChallengeStore) -> f64 {
    select_user_stats(store).completion_rate()
}

/// Aggregated user statistics
pub fn select_user_stats(store: &ChallengeStore) -> UserStats {
    UserStats::from_challenges(store.challenges())
}

/// Unlocked achievements
pub fn select_achievements(store: &ChallengeStore) -> AchievementSet {
    achievements::evaluate(&select_user_stats(store))
}

/// What the player is currently doing, as far as a card is concerned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub challenge_id: ChallengeId,
    pub is_playing: bool,
}

/// Action offered by a challenge card's play button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayAction {
    Completed,
    Playing,
    Resume,
    Play,
}

impl PlayAction {
    /// Button label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "Completed ✓",
            Self::Playing => "Playing...",
            Self::Resume => "Resume",
            Self::Play => "Play Challenge",
        }
    }
}

/// View model for one challenge card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeCard {
    pub id: ChallengeId,
    pub title: String,
    pub artist: String,
    pub description: String,
    pub difficulty: String,
    pub duration: String,
    pub points: u32,
    /// Progress rounded to a whole percent
    pub progress_percent: u32,
    pub show_progress_bar: bool,
    pub is_current_track: bool,
    pub action: PlayAction,
    pub action_enabled: bool,
}

/// Build the card view for a challenge
pub fn select_card(
    store: &ChallengeStore,
    id: &str,
    now_playing: Option<&NowPlaying>,
) -> Option<ChallengeCard> {
    let challenge = store.get(id)?;

    let is_current_track = now_playing.is_some_and(|np| np.challenge_id == challenge.id);
    let is_playing = is_current_track && now_playing.is_some_and(|np| np.is_playing);

    let action = if challenge.completed {
        PlayAction::Completed
    } else if is_playing {
        PlayAction::Playing
    } else if is_current_track {
        PlayAction::Resume
    } else {
        PlayAction::Play
    };

    Some(ChallengeCard {
        id: challenge.id.clone(),
        title: challenge.title.clone(),
        artist: challenge.artist.clone(),
        description: challenge.description.clone(),
        difficulty: challenge.difficulty.to_string(),
        duration: format_duration(challenge.duration_seconds),
        points: challenge.points,
        progress_percent: challenge.progress.round() as u32,
        show_progress_bar: challenge.progress > 0.0,
        is_current_track,
        action,
        action_enabled: !challenge.completed,
    })
}

/// Cards for the whole catalog
pub fn select_cards(store: &ChallengeStore, now_playing: Option<&NowPlaying>) -> Vec<ChallengeCard> {
    store
        .challenges()
        .iter()
        .filter_map(|c| select_card(store, c.id.as_str(), now_playing))
        .collect()
}

/// Format seconds as `m:ss`
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Difficulty;

    fn store() -> ChallengeStore {
        ChallengeStore::new(vec![
            Challenge::new("c1", "One", "A", Difficulty::Easy, 180.0, 50),
            Challenge::new("c2", "Two", "B", Difficulty::Hard, 65.0, 80),
        ])
        .unwrap()
    }

    #[test]
    fn selectors_reflect_commits() {
        let mut store = store();
        assert_eq!(select_total_points(&store), 0);
        assert!(select_completed_challenges(&store).is_empty());

        store.apply_progress("c2", 100.0).unwrap();

        assert_eq!(select_total_points(&store), 80);
        assert_eq!(select_completed_challenges(&store)[0].id.as_str(), "c2");
        assert_eq!(select_completion_rate(&store), 50.0);
        assert_eq!(select_challenges(&store).len(), 2);
    }

    #[test]
    fn formats_duration() {
        assert_eq!(format_duration(180.0), "3:00");
        assert_eq!(format_duration(65.0), "1:05");
        assert_eq!(format_duration(9.7), "0:09");
        assert_eq!(format_duration(f64::NAN), "0:00");
    }

    #[test]
    fn card_action_labels() {
        let mut store = store();
        let playing = NowPlaying {
            challenge_id: ChallengeId::new("c1"),
            is_playing: true,
        };
        let paused = NowPlaying {
            is_playing: false,
            ..playing.clone()
        };

        assert_eq!(select_card(&store, "c1", None).unwrap().action, PlayAction::Play);
        assert_eq!(
            select_card(&store, "c1", Some(&playing)).unwrap().action.label(),
            "Playing..."
        );
        assert_eq!(select_card(&store, "c1", Some(&paused)).unwrap().action, PlayAction::Resume);
        assert_eq!(select_card(&store, "c2", Some(&playing)).unwrap().action, PlayAction::Play);

        store.apply_progress("c1", 100.0).unwrap();
        let card = select_card(&store, "c1", Some(&playing)).unwrap();
        assert_eq!(card.action, PlayAction::Completed);
        assert!(!card.action_enabled);
    }

    #[test]
    fn card_rounds_progress() {
        let mut store = store();
        store.apply_progress("c1", 33.6).unwrap();
        let card = select_card(&store, "c1", None).unwrap();
        assert_eq!(card.progress_percent, 34);
        assert!(card.show_progress_bar);
        assert_eq!(card.duration, "3:00");
        assert_eq!(card.difficulty, "🎧 EASY");
    }
}
