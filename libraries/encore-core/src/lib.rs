//! Encore Core
//!
//! Platform-agnostic challenge model for Encore.
//!
//! This crate holds everything that does not touch the playback backend or
//! storage:
//! - **Domain Types**: `Challenge`, `Difficulty`, `ChallengeId`, `ProgressRecord`
//! - **Progress Model**: monotonic, clamped progress and sticky completion
//! - **Catalog Store**: validated in-memory catalog with a single write path
//! - **Selectors**: read-only aggregates (points, completions, cards)
//! - **Achievements**: stateless projection of user statistics
//! - **Storage Port**: `ProgressStore`, implemented by `encore-storage`
//!
//! # Example
//!
//! ```rust
//! use encore_core::{selectors, Challenge, ChallengeStore, Difficulty};
//!
//! let mut store = ChallengeStore::new(vec![
//!     Challenge::new("c1", "Song", "Artist", Difficulty::Easy, 180.0, 50),
//! ])
//! .unwrap();
//!
//! let change = store.apply_progress("c1", 100.0).unwrap();
//! assert!(change.newly_completed());
//! assert_eq!(selectors::select_total_points(&store), 50);
//! ```

#![forbid(unsafe_code)]

pub mod achievements;
pub mod error;
pub mod progress;
pub mod sample;
pub mod selectors;
pub mod stats;
pub mod storage;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use achievements::{Achievement, AchievementSet};
pub use error::{CoreError, Result};
pub use progress::{apply_progress, compute_progress, ProgressChange};
pub use stats::UserStats;
pub use storage::ProgressStore;
pub use store::ChallengeStore;
pub use types::{Challenge, ChallengeId, Difficulty, ProgressRecord};
