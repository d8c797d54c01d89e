/// ID types for Encore entities
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Challenge identifier
///
/// Stable across catalog reloads and used as the key of persisted progress
/// and as the track id handed to the playback backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeId(String);

impl ChallengeId {
    /// Create a new challenge ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChallengeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ChallengeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ChallengeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_id_serializes_transparently() {
        let id = ChallengeId::new("c1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"c1\"");

        let parsed: ChallengeId = serde_json::from_str("\"c2\"").unwrap();
        assert_eq!(parsed.as_str(), "c2");
    }
}
