//! In-memory progress store
//!
//! Same merge semantics as the `SQLite` store. Used for tests and for runs
//! that should leave nothing on disk.

use async_trait::async_trait;
use encore_core::{storage::ProgressStore, ChallengeId, ProgressRecord, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    records: Mutex<HashMap<ChallengeId, ProgressRecord>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing records
    pub fn with_records(records: impl IntoIterator<Item = (ChallengeId, ProgressRecord)>) -> Self {
        Self {
            records: Mutex::new(
                records
                    .into_iter()
                    .map(|(id, record)| (id, record.normalized()))
                    .collect(),
            ),
        }
    }

    /// Current record for a challenge
    pub fn get(&self, id: &str) -> Option<ProgressRecord> {
        self.records().get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<ChallengeId, ProgressRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn load_all(&self) -> Result<HashMap<ChallengeId, ProgressRecord>> {
        Ok(self.records().clone())
    }

    async fn save(&self, id: &ChallengeId, record: ProgressRecord) -> Result<()> {
        let mut records = self.records();
        let merged = match records.get(id) {
            Some(existing) => existing.merge(record),
            None => record.normalized(),
        };
        records.insert(id.clone(), merged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(progress: f64, completed: bool) -> ProgressRecord {
        ProgressRecord {
            progress,
            completed,
        }
    }

    #[tokio::test]
    async fn save_never_lowers_progress() {
        let store = MemoryProgressStore::new();
        let id = ChallengeId::new("c1");

        store.save(&id, record(60.0, false)).await.unwrap();
        store.save(&id, record(10.0, false)).await.unwrap();
        assert_eq!(store.get("c1"), Some(record(60.0, false)));

        store.save(&id, record(100.0, true)).await.unwrap();
        store.save(&id, record(0.0, false)).await.unwrap();
        assert_eq!(store.get("c1"), Some(record(100.0, true)));
    }

    #[tokio::test]
    async fn seeded_records_are_normalized() {
        let store = MemoryProgressStore::with_records([(ChallengeId::new("c1"), record(40.0, true))]);
        let all = store.load_all().await.unwrap();
        assert_eq!(all[&ChallengeId::new("c1")], record(100.0, true));
    }
}
