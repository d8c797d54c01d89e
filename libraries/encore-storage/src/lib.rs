//! Encore Storage
//!
//! `SQLite` persistence for challenge progress.
//!
//! The catalog itself is static content; only the per-challenge
//! `{progress, completed}` record is stored, keyed by challenge id, in the
//! `challenge_progress` table. Writes merge monotonically, so an old or
//! duplicated write can never take credit away.
//!
//! # Example
//!
//! ```rust,no_run
//! use encore_core::storage::ProgressStore;
//! use encore_storage::SqliteProgressStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteProgressStore::open("sqlite://encore.db").await?;
//! let records = store.load_all().await?;
//! println!("{} challenges have progress", records.len());
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
mod memory;

pub mod progress;

pub use context::SqliteProgressStore;
pub use error::{Result, StorageError};
pub use memory::MemoryProgressStore;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// Call once at startup, before any progress is read.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Create a new `SQLite` pool
///
/// File databases are created if missing and opened in WAL mode. An
/// in-memory URL (`sqlite::memory:`) gets a single long-lived connection,
/// since each connection would otherwise see its own empty database.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;
    use std::time::Duration;

    let in_memory = database_url.contains(":memory:");
    debug!(database_url, in_memory, "Creating SQLite pool");

    let mut options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(30));
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    Ok(pool_options.connect_with(options).await?)
}
