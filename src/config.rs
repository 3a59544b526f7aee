//! Application configuration stored as TOML.
//!
//! Lives at `<config dir>/vocab-review/config.toml` and is written with
//! defaults on first run. `VOCAB_REVIEW_DB` overrides the database path.

use crate::error::ConfigError;
use crate::scheduler::DEFAULT_MAX_WRITE_ATTEMPTS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "vocab-review";
pub const DATABASE_ENV: &str = "VOCAB_REVIEW_DB";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file; unset means the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    /// Identity forwarded to the scheduler for every operation.
    pub learner_id: String,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub max_write_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            learner_id: "learner".to_string(),
            log_filter: "info".to_string(),
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(APP_DIR).join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, content).map_err(io_err)
    }

    /// Database file to open: `VOCAB_REVIEW_DB`, then the configured path,
    /// then `<data dir>/vocab-review/review.sqlite3`.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        self.resolve_database_path(std::env::var_os(DATABASE_ENV).map(PathBuf::from))
    }

    fn resolve_database_path(&self, env_override: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = env_override.filter(|p| !p.as_os_str().is_empty()) {
            return Ok(path);
        }
        if let Some(path) = self.database_path.clone() {
            return Ok(path);
        }
        let dir = dirs::data_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(APP_DIR).join("review.sqlite3"))
    }
}
