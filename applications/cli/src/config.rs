/// Application configuration
use encore_playback::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file, read from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "encore.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),

    #[error(transparent)]
    Load(#[from] config::ConfigError),
}

type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default = "default_simulation")]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogSettings {
    /// JSON catalog; the built-in sample catalog is used when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Seconds of audio played per wall-clock second
    #[serde(default = "default_speed")]
    pub speed: f64,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `encore.toml` is read if
    /// present. `ENCORE_`-prefixed variables override both, with `__`
    /// between nesting levels (`ENCORE_STORAGE__DATABASE_URL`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("ENCORE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "database URL is required (set ENCORE_STORAGE__DATABASE_URL)".to_string(),
            ));
        }

        if !self.simulation.speed.is_finite() || self.simulation.speed <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "simulation speed must be positive, got {}",
                self.simulation.speed
            )));
        }

        if self.engine.call_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "engine.call_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.engine.telemetry_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "engine.telemetry_interval_ms must be greater than zero".to_string(),
            ));
        }

        if let Some(path) = &self.catalog.path {
            if !path.exists() {
                return Err(ConfigError::Invalid(format!(
                    "catalog not found at {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}

// Default values
fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
    }
}

fn default_database_url() -> String {
    "sqlite://encore.db".to_string()
}

fn default_simulation() -> SimulationSettings {
    SimulationSettings {
        speed: default_speed(),
    }
}

fn default_speed() -> f64 {
    1.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogSettings::default(),
            storage: default_storage(),
            engine: EngineConfig::default(),
            simulation: default_simulation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.engine.telemetry_interval_ms, 1000);
        assert_eq!(config.engine.call_timeout_ms, 5000);
        assert_eq!(config.storage.database_url, "sqlite://encore.db");
    }

    #[test]
    fn rejects_non_positive_speed() {
        let mut config = AppConfig::default();
        config.simulation.speed = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_missing_catalog_file() {
        let mut config = AppConfig::default();
        config.catalog.path = Some(PathBuf::from("/definitely/not/here.json"));
        assert!(config.validate().is_err());
    }
}
