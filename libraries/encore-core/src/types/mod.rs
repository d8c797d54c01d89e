/// Core domain types for Encore
mod challenge;
mod ids;

pub use challenge::{Challenge, Difficulty, ProgressRecord};
pub use ids::ChallengeId;
