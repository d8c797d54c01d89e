//! Progress persistence port
//!
//! Implemented by `encore-storage` (SQLite and in-memory). The sync engine
//! only sees this trait.

use crate::error::Result;
use crate::types::{ChallengeId, ProgressRecord};
use async_trait::async_trait;
use std::collections::HashMap;

/// Durable store for per-challenge progress
///
/// Implementations must never lower a stored record: a save carrying less
/// progress than what is already persisted keeps the stored values.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Load every persisted record
    async fn load_all(&self) -> Result<HashMap<ChallengeId, ProgressRecord>>;

    /// Persist one challenge's record
    async fn save(&self, id: &ChallengeId, record: ProgressRecord) -> Result<()>;

    /// Persist several records
    async fn save_all(&self, records: &HashMap<ChallengeId, ProgressRecord>) -> Result<()> {
        for (id, record) in records {
            self.save(id, *record).await?;
        }
        Ok(())
    }
}
