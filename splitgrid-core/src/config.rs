//! # Configuration management for Splitgrid Core
//!
//! Settings are read from a TOML file and fall back to defaults. Settings
//! are loaded in the following order of priority:
//! 1. Command line arguments (highest priority, applied by the host)
//! 2. Configuration file
//! 3. Default values (lowest priority)

use crate::drag::{DragController, DEFAULT_MIN_FRACTION};
use crate::layout::{SessionMode, MAX_PANES};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Splitgrid.
///
/// # Example
///
/// ```rust
/// use splitgrid_core::Config;
///
/// let config = Config::default();
/// assert_eq!(config.grid.max_panes, 16);
/// assert_eq!(config.logging.level, "info");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Grid engine settings
    #[serde(default)]
    pub grid: GridConfig,
    /// Persisted state settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Grid engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Upper bound on panes per session (1..=16)
    pub max_panes: usize,
    /// Largest minimum size either side of a dragged splitter keeps
    pub drag_min_fraction: f64,
    /// Mode used when a launch does not name one
    pub default_mode: SessionMode,
}

/// Persisted state settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON document holding the shared key space
    pub state_file: PathBuf,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_panes: MAX_PANES,
            drag_min_fraction: DEFAULT_MIN_FRACTION,
            default_mode: SessionMode::Quad,
        }
    }
}

impl GridConfig {
    /// Validate the grid settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_panes == 0 || self.max_panes > MAX_PANES {
            return Err(Error::validation(
                "grid.max_panes",
                "Max panes must be between 1 and 16",
            ));
        }

        if !DragController::accepts_min_fraction(self.drag_min_fraction) {
            return Err(Error::validation(
                "grid.drag_min_fraction",
                "Drag minimum fraction must be in (0, 0.5]",
            ));
        }

        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("splitgrid")
                .join("state.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, or use defaults when it
    /// is missing or invalid.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from the default config file.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from_file(&config_path)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use splitgrid_core::Config;
    /// use std::path::Path;
    ///
    /// let config = Config::load_from_file(Path::new("splitgrid.toml"))?;
    /// # Ok::<(), splitgrid_core::Error>(())
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.validate()?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::config(format!("Failed to create config directory: {}", e)))?;
        }

        std::fs::write(path, content)
            .map_err(|e| Error::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration values.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::Config;
    ///
    /// let mut config = Config::default();
    /// assert!(config.validate().is_ok());
    /// config.grid.max_panes = 32;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;

        if !["error", "warn", "info", "debug", "trace"].contains(&self.logging.level.as_str()) {
            return Err(Error::validation(
                "logging.level",
                "Log level must be one of: error, warn, info, debug, trace",
            ));
        }

        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::config("Could not determine config directory"))?
            .join("splitgrid");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.grid.default_mode, SessionMode::Quad);
        assert_eq!(config.grid.drag_min_fraction, 0.2);
        assert!(config.storage.state_file.ends_with("splitgrid/state.json"));
    }

    #[test]
    fn test_config_validation_errors() {
        let mut config = Config::default();
        config.grid.max_panes = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.grid.drag_min_fraction = 0.75;
        assert!(config.validate().is_err());

        config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [grid]
            max_panes = 9
            default_mode = "dual"
            "#,
        )
        .unwrap();
        assert_eq!(config.grid.max_panes, 9);
        assert_eq!(config.grid.default_mode, SessionMode::Dual);
        assert_eq!(config.grid.drag_min_fraction, 0.2);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.grid.max_panes = 8;
        config.save_to_file(&config_path).unwrap();

        let loaded = Config::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "[logging]\nlevel = \"loud\"\n").unwrap();
        assert!(Config::load_from_file(&config_path).unwrap_err().is_validation());
    }
}
