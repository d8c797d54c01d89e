/// Catalog loading
use anyhow::{Context, Result};
use encore_core::{sample::sample_challenges, ChallengeStore, ProgressStore};
use encore_storage::SqliteProgressStore;
use std::path::Path;
use std::sync::Arc;

use crate::config::AppConfig;

/// Read a JSON catalog, or fall back to the built-in sample challenges
pub async fn load_catalog(path: Option<&Path>) -> Result<ChallengeStore> {
    let Some(path) = path else {
        return ChallengeStore::new(sample_challenges()).context("Built-in catalog is invalid");
    };

    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;

    ChallengeStore::from_json(&json)
        .with_context(|| format!("Invalid catalog {}", path.display()))
}

/// Open the configured progress database
pub async fn open_progress_store(config: &AppConfig) -> Result<Arc<SqliteProgressStore>> {
    let store = SqliteProgressStore::open(&config.storage.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.storage.database_url))?;
    Ok(Arc::new(store))
}

/// Catalog with persisted progress applied
pub async fn load_with_progress(
    config: &AppConfig,
    progress_store: &dyn ProgressStore,
) -> Result<ChallengeStore> {
    let mut catalog = load_catalog(config.catalog.path.as_deref()).await?;
    let records = progress_store
        .load_all()
        .await
        .context("Failed to load saved progress")?;
    catalog.seed_progress(records);
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn falls_back_to_sample_catalog() {
        let catalog = load_catalog(None).await.unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.contains("1"));
    }

    #[tokio::test]
    async fn reads_catalog_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"solo","title":"Solo","artist":"One","difficulty":"hard","duration":95,"points":75}}]"#
        )
        .unwrap();

        let catalog = load_catalog(Some(file.path())).await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("solo").unwrap().points, 75);
    }

    #[tokio::test]
    async fn reports_invalid_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = load_catalog(Some(file.path())).await.unwrap_err();
        assert!(err.to_string().contains("Invalid catalog"));
    }
}
