// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{app_info, credentials, decode, prompt, surface, timing};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Text shown on the biometric prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    pub title: String,
    pub subtitle: String,
    /// Label of the button that falls back to PIN entry
    pub negative_button: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            title: prompt::TITLE.to_string(),
            subtitle: prompt::SUBTITLE.to_string(),
            negative_button: prompt::NEGATIVE_BUTTON.to_string(),
        }
    }
}

/// Bridge configuration, stored as JSON
///
/// Every field has a default, so partial files are fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preview texture width requested by `get_camera_texture`
    pub texture_width: u32,
    /// Preview texture height requested by `get_camera_texture`
    pub texture_height: u32,
    /// Biometric prompt timeout
    pub auth_timeout_ms: u64,
    /// Decode worker grace period on stop
    pub shutdown_grace_ms: u64,
    /// Upper bound on camera acquisition
    pub camera_acquire_timeout_ms: u64,
    /// Frames are downscaled to this before QR detection
    pub qr_max_dimension: u32,
    /// Frame interval of the still-image camera
    pub still_image_frame_interval_ms: u64,
    /// Biometric prompt text
    pub prompt: PromptSettings,
    /// Credential store file (default: platform data dir)
    pub credential_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            texture_width: surface::DEFAULT_WIDTH,
            texture_height: surface::DEFAULT_HEIGHT,
            auth_timeout_ms: timing::AUTH_TIMEOUT.as_millis() as u64,
            shutdown_grace_ms: timing::SHUTDOWN_GRACE.as_millis() as u64,
            camera_acquire_timeout_ms: timing::CAMERA_ACQUIRE_TIMEOUT.as_millis() as u64,
            qr_max_dimension: decode::MAX_DIMENSION,
            still_image_frame_interval_ms: timing::STILL_IMAGE_FRAME_INTERVAL.as_millis() as u64,
            prompt: PromptSettings::default(),
            credential_path: None,
        }
    }
}

impl Config {
    /// `<config dir>/device-bridge/config.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(app_info::DIR_NAME).join(app_info::CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, text).map_err(io_err)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn camera_acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.camera_acquire_timeout_ms)
    }

    pub fn still_image_frame_interval(&self) -> Duration {
        Duration::from_millis(self.still_image_frame_interval_ms)
    }

    /// Configured credential store path, else `<data dir>/device-bridge/secure_prefs.json`
    pub fn credential_path(&self) -> Option<PathBuf> {
        self.credential_path.clone().or_else(|| {
            dirs::data_dir().map(|dir| {
                dir.join(app_info::DIR_NAME)
                    .join(credentials::STORE_FILE_NAME)
            })
        })
    }
}
