//! Challenge progress persistence
//!
//! Writes are monotonic at the database level too: an upsert keeps the
//! larger progress and never clears `completed`.

use crate::error::Result;
use encore_core::{ChallengeId, ProgressRecord};
use sqlx::SqlitePool;
use std::collections::HashMap;

const UPSERT: &str = "INSERT INTO challenge_progress (challenge_id, progress, completed, updated_at)
     VALUES (?, ?, ?, ?)
     ON CONFLICT(challenge_id)
     DO UPDATE SET
        progress = CASE
            WHEN MAX(challenge_progress.completed, excluded.completed) = 1 THEN 100
            ELSE MAX(challenge_progress.progress, excluded.progress)
        END,
        completed = MAX(challenge_progress.completed, excluded.completed),
        updated_at = excluded.updated_at";

/// Load every stored record
///
/// Records are normalized on the way out; a stored `completed` flag pins
/// progress to 100.
pub async fn get_all(pool: &SqlitePool) -> Result<HashMap<ChallengeId, ProgressRecord>> {
    let rows: Vec<(String, f64, i64)> =
        sqlx::query_as("SELECT challenge_id, progress, completed FROM challenge_progress")
            .fetch_all(pool)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(challenge_id, progress, completed)| {
            let record = ProgressRecord {
                progress,
                completed: completed != 0,
            }
            .normalized();
            (ChallengeId::new(challenge_id), record)
        })
        .collect())
}

/// Get one challenge's record
pub async fn get(pool: &SqlitePool, challenge_id: &str) -> Result<Option<ProgressRecord>> {
    let row: Option<(f64, i64)> =
        sqlx::query_as("SELECT progress, completed FROM challenge_progress WHERE challenge_id = ?")
            .bind(challenge_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|(progress, completed)| {
        ProgressRecord {
            progress,
            completed: completed != 0,
        }
        .normalized()
    }))
}

/// Insert or raise a challenge's record
pub async fn upsert(pool: &SqlitePool, challenge_id: &str, record: ProgressRecord) -> Result<()> {
    let record = record.normalized();

    sqlx::query(UPSERT)
        .bind(challenge_id)
        .bind(record.progress)
        .bind(i64::from(record.completed))
        .bind(chrono::Utc::now().timestamp())
        .execute(pool)
        .await?;

    Ok(())
}

/// Write many records in one transaction
pub async fn upsert_all(
    pool: &SqlitePool,
    records: &HashMap<ChallengeId, ProgressRecord>,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now().timestamp();

    for (challenge_id, record) in records {
        let record = record.normalized();
        sqlx::query(UPSERT)
            .bind(challenge_id.as_str())
            .bind(record.progress)
            .bind(i64::from(record.completed))
            .bind(now)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Last write time for a challenge, as a Unix timestamp
pub async fn updated_at(pool: &SqlitePool, challenge_id: &str) -> Result<Option<i64>> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT updated_at FROM challenge_progress WHERE challenge_id = ?")
            .bind(challenge_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(updated_at,)| updated_at))
}
