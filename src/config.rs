// Configuration for the tasklist CLI

use crate::json_file::JsonFileSlot;
use crate::persistence::Persistence;
use crate::sqlite::SqliteSlot;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Storage backend holding the task slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Sqlite,
}

impl FromStr for Backend {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Backend::File),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(eyre!("Invalid backend: {} (expected file or sqlite)", other)),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::File => write!(f, "file"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Settings read from `tasklist.yml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend
    #[serde(default)]
    pub backend: Backend,

    /// Directory holding the task file or database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Slot key the list is saved under
    #[serde(default = "default_key")]
    pub key: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("tasklist"))
        .unwrap_or_else(|| PathBuf::from(".tasklist"))
}

fn default_key() -> String {
    "todos".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            data_dir: default_data_dir(),
            key: default_key(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tasklist").join("tasklist.yml"))
    }

    /// Load from `path` (or the default location), then apply environment overrides
    ///
    /// An explicitly given path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse config file {}", path.display()))?;

        debug!(file = ?path, "Loaded config");
        Ok(config)
    }

    /// Override fields from `TASKLIST_*` variables
    fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = var("TASKLIST_BACKEND") {
            self.backend = backend.parse()?;
        }

        if let Some(dir) = var("TASKLIST_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(key) = var("TASKLIST_KEY") {
            self.key = key;
        }

        if let Some(level) = var("TASKLIST_LOG_LEVEL") {
            self.log_level = level;
        }

        Ok(())
    }

    /// Open the configured slot
    pub fn open_slot(&self) -> Result<Box<dyn Persistence>> {
        debug!(backend = %self.backend, dir = ?self.data_dir, key = %self.key, "Opening slot");

        let slot: Box<dyn Persistence> = match self.backend {
            Backend::File => Box::new(JsonFileSlot::open(&self.data_dir, &self.key)?),
            Backend::Sqlite => Box::new(SqliteSlot::open(self.data_dir.join("tasklist.db"), &self.key)?),
        };
        Ok(slot)
    }

    /// Log level as a tracing filter, `warn` when unrecognized
    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::WARN)
    }
}
