use crate::{create_pool, progress, run_migrations, StorageError};
use async_trait::async_trait;
use encore_core::{storage::ProgressStore, ChallengeId, ProgressRecord, Result};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::info;

/// Progress store backed by `SQLite`
#[derive(Debug, Clone)]
pub struct SqliteProgressStore {
    pool: SqlitePool,
}

impl SqliteProgressStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect, migrate and wrap a database
    pub async fn open(database_url: &str) -> std::result::Result<Self, StorageError> {
        let pool = create_pool(database_url).await?;
        run_migrations(&pool).await?;
        info!(database_url, "Progress database ready");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn load_all(&self) -> Result<HashMap<ChallengeId, ProgressRecord>> {
        Ok(progress::get_all(&self.pool).await?)
    }

    async fn save(&self, id: &ChallengeId, record: ProgressRecord) -> Result<()> {
        Ok(progress::upsert(&self.pool, id.as_str(), record).await?)
    }

    async fn save_all(&self, records: &HashMap<ChallengeId, ProgressRecord>) -> Result<()> {
        Ok(progress::upsert_all(&self.pool, records).await?)
    }
}
