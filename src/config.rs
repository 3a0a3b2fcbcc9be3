// SPDX-License-Identifier: GPL-3.0-only

//! User configuration stored as JSON in the user's config directory

use crate::backends::camera::CameraBackendType;
use crate::constants::{self, preview};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera backend to use (V4L2 or the synthetic test pattern)
    pub backend: CameraBackendType,
    /// Requested preview width
    pub preview_width: u32,
    /// Requested preview height
    pub preview_height: u32,
    /// Requested preview framerate
    pub framerate: u32,
    /// Effect identifier selected when the terminal front end last exited
    pub last_effect: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            preview_width: preview::DEFAULT_WIDTH,
            preview_height: preview::DEFAULT_HEIGHT,
            framerate: preview::DEFAULT_FRAMERATE,
            last_effect: None,
        }
    }
}

impl Config {
    /// Default location: `<config dir>/effect-cam/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(constants::APP_DIR_NAME)
                .join(constants::CONFIG_FILE_NAME)
        })
    }

    /// Load the configuration from the default location.
    ///
    /// A missing or unreadable file is not an error; defaults are used.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory available, using default configuration");
                Self::default()
            }
        }
    }

    /// Load the configuration from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        match Self::try_load_from(path) {
            Ok(config) => config,
            Err(AppError::Storage(msg)) => {
                debug!(path = %path.display(), error = %msg, "Config not readable, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                Self::default()
            }
        }
    }

    /// Load the configuration from `path`, reporting why it failed
    pub fn try_load_from(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<()> {
        let path = Self::default_path()
            .ok_or_else(|| AppError::Config("no config directory available".to_string()))?;
        self.save_to(&path)
    }

    /// Save to `path`, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    fn validate(&self) -> AppResult<()> {
        if self.preview_width == 0 || self.preview_height == 0 {
            return Err(AppError::Config(format!(
                "preview size {}x{} is empty",
                self.preview_width, self.preview_height
            )));
        }
        if self.framerate == 0 {
            return Err(AppError::Config("framerate must be positive".to_string()));
        }
        Ok(())
    }
}
