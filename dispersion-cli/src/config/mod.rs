//! Configuration file handling
//!
//! The config lives in `<config_dir>/dispersion/config.toml` unless a path is
//! given on the command line or through `DISPERSION_CONFIG`. A missing file
//! means defaults for everything.

pub mod repository;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dispersion::PipelineOptions;

pub const CONFIG_ENV_VAR: &str = "DISPERSION_CONFIG";

const APP_DIR: &str = "dispersion";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "history.db";
const PROCESSED_DIR: &str = "processed_files";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory for the history database and stored templates
    pub data_dir: PathBuf,
    /// Defaults to `<data_dir>/history.db`
    pub database_path: Option<PathBuf>,
    /// Defaults to `<data_dir>/processed_files`
    pub processed_dir: Option<PathBuf>,
    pub pipeline: PipelineOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_path: None,
            processed_dir: None,
            pipeline: PipelineOptions::default(),
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from an explicit path, or the default location if none is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DATABASE_FILE))
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.processed_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(PROCESSED_DIR))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
