// SPDX-License-Identifier: GPL-3.0-only

//! Scanner configuration
//!
//! Settings are stored as JSON. A missing file is not an error: the
//! defaults are used instead.

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_FEED_INTERVAL, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_DECODE_DIMENSION, MIN_DECODE_DIMENSION,
};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Decoder tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Maximum frame dimension before detection (larger frames are downscaled)
    pub max_dimension: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DECODE_DIMENSION,
        }
    }
}

/// Simulated camera feed used by the `scan` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Delay between submitted frames in milliseconds
    pub interval_ms: u64,
}

impl FeedConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_FEED_INTERVAL.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decoder: DecoderConfig,
    pub feed: FeedConfig,
    /// tracing filter directive used when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            feed: FeedConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Default location: `<config dir>/scanner/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from `path`, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from the given path, or from [`Config::default_path`] when `None`
    pub fn load_or_default(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) => Self::load(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Write configuration as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.decoder.max_dimension < MIN_DECODE_DIMENSION {
            return Err(AppError::Config(format!(
                "decoder.max_dimension must be at least {} (got {})",
                MIN_DECODE_DIMENSION, self.decoder.max_dimension
            )));
        }
        Ok(())
    }
}
