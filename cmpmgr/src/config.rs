//! Persisted user settings.
//!
//! The settings file is JSON and lives, by default, at
//! `<config dir>/kicad-tools/cmpmgr.json`:
//!
//! ```json
//! {
//!   "component_ignore": ["TP", "MH"],
//!   "log_level": "warn"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::index::IgnorePatterns;

const CONFIG_DIR_NAME: &str = "kicad-tools";
const CONFIG_FILE_NAME: &str = "cmpmgr.json";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Reference prefixes excluded from the component index.
    #[serde(default)]
    pub component_ignore: Vec<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            component_ignore: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Settings {
    /// # Errors
    ///
    /// Rejects empty ignore patterns and unknown log levels.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.component_ignore.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::Validation {
                message: "component_ignore entries must not be empty".to_string(),
            });
        }
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Validation {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.log_level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        Ok(())
    }

    pub fn ignore_patterns(&self) -> IgnorePatterns {
        IgnorePatterns::new(self.component_ignore.iter().cloned())
    }

    /// Add a pattern unless it is already present. Returns whether it was added.
    pub fn add_ignore(&mut self, pattern: &str) -> bool {
        if self.component_ignore.iter().any(|p| p == pattern) {
            return false;
        }
        self.component_ignore.push(pattern.to_string());
        true
    }

    /// Returns whether the pattern was present.
    pub fn remove_ignore(&mut self, pattern: &str) -> bool {
        let before = self.component_ignore.len();
        self.component_ignore.retain(|p| p != pattern);
        self.component_ignore.len() != before
    }
}

#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load settings from `path`, or from the default location when `path` is `None`.
///
/// A missing default file yields default settings; a missing explicit file is an
/// error.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is malformed, or fails validation.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let (settings_path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(Settings::default()),
        },
    };

    if !settings_path.exists() {
        if explicit {
            return Err(ConfigError::NotFound {
                path: settings_path,
            });
        }
        tracing::debug!("No settings file at {}, using defaults", settings_path.display());
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(&settings_path).map_err(|e| ConfigError::Read {
        path: settings_path.clone(),
        source: e,
    })?;
    let settings: Settings = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: settings_path.clone(),
        source: e,
    })?;
    settings.validate()?;

    tracing::debug!("Loaded settings from {}", settings_path.display());
    Ok(settings)
}

/// Write `settings` to `path` (or the default location), creating parent directories.
///
/// # Errors
///
/// Returns an error if no location is available or the file cannot be written.
pub fn save_settings(path: Option<&Path>, settings: &Settings) -> Result<PathBuf, ConfigError> {
    let settings_path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path().ok_or(ConfigError::NoConfigDir)?,
    };
    settings.validate()?;

    let write_error = |source| ConfigError::Write {
        path: settings_path.clone(),
        source,
    };
    if let Some(parent) = settings_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(|e| ConfigError::Parse {
        path: settings_path.clone(),
        source: e,
    })?;
    std::fs::write(&settings_path, json).map_err(write_error)?;

    tracing::info!("Saved settings to {}", settings_path.display());
    Ok(settings_path)
}
