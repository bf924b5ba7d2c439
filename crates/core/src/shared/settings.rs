use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::domain::capture_device::DevicePosition;
use crate::shared::constants::{
    DEFAULT_FRAME_RATE, DEFAULT_MAX_STEPS, DEFAULT_POLL_INTERVAL_MS, ENROLLMENT_LABEL,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub frame_rate: u32,
    pub max_steps: u32,
    pub enrollment_label: String,
    pub poll_interval_ms: u64,
    pub camera_position: DevicePosition,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            max_steps: DEFAULT_MAX_STEPS,
            enrollment_label: ENROLLMENT_LABEL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            camera_position: DevicePosition::Front,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceEnroll").join("settings.json"))
    }

    /// Loads the user settings file, silently falling back to defaults.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| Self::load_from(&path).ok())
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.frame_rate == 0 {
            return Err(SettingsError::Invalid("frame_rate must be positive".into()));
        }
        if self.max_steps == 0 {
            return Err(SettingsError::Invalid("max_steps must be positive".into()));
        }
        if self.enrollment_label.is_empty() {
            return Err(SettingsError::Invalid(
                "enrollment_label must not be empty".into(),
            ));
        }
        Ok(())
    }
}
