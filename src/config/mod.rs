use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Timing settings of the crossfade engine plus the output device choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossfadeConfig {
    /// Remaining time on the playing track at which the crossfade starts
    pub crossfade_window_ms: u64,
    pub fade_duration_ms: u64,
    pub fade_step_interval_ms: u64,
    pub position_poll_interval_ms: u64,
    pub preferred_device: Option<String>,
}

impl Default for CrossfadeConfig {
    fn default() -> Self {
        Self {
            crossfade_window_ms: 10_000,
            fade_duration_ms: 10_000,
            fade_step_interval_ms: 250,
            position_poll_interval_ms: 1_000,
            preferred_device: None,
        }
    }
}

impl CrossfadeConfig {
    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fade_step_interval_ms == 0 {
            return Err(ConfigError::Invalid("fade_step_interval_ms must be greater than 0".to_string()));
        }
        if self.position_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "position_poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.fade_duration_ms < self.fade_step_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "fade_duration_ms ({}) must be at least fade_step_interval_ms ({})",
                self.fade_duration_ms, self.fade_step_interval_ms
            )));
        }
        Ok(())
    }

    pub fn crossfade_window(&self) -> Duration {
        Duration::from_millis(self.crossfade_window_ms)
    }

    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms)
    }

    pub fn fade_step_interval(&self) -> Duration {
        Duration::from_millis(self.fade_step_interval_ms)
    }

    pub fn position_poll_interval(&self) -> Duration {
        Duration::from_millis(self.position_poll_interval_ms)
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    config: CrossfadeConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        let config = match Self::load_config(&config_path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring unreadable config at {}: {}", config_path.display(), e);
                CrossfadeConfig::default()
            }
        };

        Ok(Self { config, config_path })
    }

    /// Manager bound to an explicit file, loading it if present
    pub fn with_path(config_path: PathBuf) -> Result<Self, ConfigError> {
        let config = Self::load_config(&config_path)?;
        Ok(Self { config, config_path })
    }

    pub fn get_config(&self) -> &CrossfadeConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update_config<F>(&mut self, updater: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut CrossfadeConfig),
    {
        let mut updated = self.config.clone();
        updater(&mut updated);
        updated.validate()?;
        self.config = updated;
        self.save_config()
    }

    pub fn set_crossfade_window_ms(&mut self, window_ms: u64) -> Result<(), ConfigError> {
        self.update_config(|config| config.crossfade_window_ms = window_ms)
    }

    pub fn set_fade_duration_ms(&mut self, duration_ms: u64) -> Result<(), ConfigError> {
        self.update_config(|config| config.fade_duration_ms = duration_ms)
    }

    pub fn set_fade_step_interval_ms(&mut self, interval_ms: u64) -> Result<(), ConfigError> {
        self.update_config(|config| config.fade_step_interval_ms = interval_ms)
    }

    pub fn set_position_poll_interval_ms(&mut self, interval_ms: u64) -> Result<(), ConfigError> {
        self.update_config(|config| config.position_poll_interval_ms = interval_ms)
    }

    pub fn set_preferred_device(&mut self, device: Option<String>) -> Result<(), ConfigError> {
        self.config.preferred_device = device;
        self.save_config()
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.config = CrossfadeConfig::default();
        self.save_config()
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::home_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(".config")
            .join("crossfade-player");

        std::fs::create_dir_all(&config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<CrossfadeConfig, ConfigError> {
        if !path.exists() {
            return Ok(CrossfadeConfig::default());
        }

        let config_content = std::fs::read_to_string(path)?;
        let config: CrossfadeConfig = toml::from_str(&config_content)?;
        config.validate()?;

        Ok(config)
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config_content = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, config_content)?;

        Ok(())
    }
}
