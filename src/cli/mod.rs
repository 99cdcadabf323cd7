use clap::Parser;
use std::time::Duration;
use thiserror::Error;

use crate::config::CrossfadeConfig;

pub mod status;
pub use status::StatusDisplay;

/// Two-track crossfade player
#[derive(Debug, Parser)]
#[command(name = "crossfade-player")]
#[command(about = "Plays two tracks back to back, crossfading whenever the playing one nears its end")]
#[command(version)]
pub struct CliApp {
    /// First track, played immediately
    #[arg(required_unless_present = "list_devices")]
    pub track_a: Option<String>,

    /// Second track, faded in when the first nears its end
    #[arg(required_unless_present = "list_devices")]
    pub track_b: Option<String>,

    /// Remaining time (ms) on the playing track that starts a crossfade
    #[arg(long = "window-ms")]
    pub window_ms: Option<u64>,

    /// Length of a crossfade in milliseconds
    #[arg(long = "fade-ms")]
    pub fade_ms: Option<u64>,

    /// Interval between fade volume steps in milliseconds
    #[arg(long = "step-ms")]
    pub step_ms: Option<u64>,

    /// Interval between position checks in milliseconds
    #[arg(long = "poll-ms")]
    pub poll_ms: Option<u64>,

    /// Output device name (falls back to the default device)
    #[arg(long)]
    pub device: Option<String>,

    /// How often to print the status line, in milliseconds
    #[arg(long = "status-interval-ms", default_value_t = 1000)]
    pub status_interval_ms: u64,

    /// Store the given timing and device options in the config file
    #[arg(long = "save-config")]
    pub save_config: bool,

    /// List output devices and exit
    #[arg(long = "list-devices")]
    pub list_devices: bool,
}

impl CliApp {
    /// Both track locators, or which one is missing
    pub fn tracks(&self) -> Result<(&str, &str), ParseError> {
        let track_a = self.track_a.as_deref().ok_or_else(|| ParseError::MissingArgument {
            argument: "TRACK_A".to_string(),
        })?;
        let track_b = self.track_b.as_deref().ok_or_else(|| ParseError::MissingArgument {
            argument: "TRACK_B".to_string(),
        })?;
        Ok((track_a, track_b))
    }

    pub fn status_interval(&self) -> Result<Duration, ParseError> {
        if self.status_interval_ms == 0 {
            return Err(ParseError::InvalidArgument {
                argument: "--status-interval-ms".to_string(),
                value: "0".to_string(),
                expected: "a positive number of milliseconds".to_string(),
            });
        }
        Ok(Duration::from_millis(self.status_interval_ms))
    }

    /// Whether any setting that `apply_overrides` would change was given
    pub fn has_overrides(&self) -> bool {
        self.window_ms.is_some()
            || self.fade_ms.is_some()
            || self.step_ms.is_some()
            || self.poll_ms.is_some()
            || self.device.is_some()
    }

    /// Replace config values with the ones given on the command line
    pub fn apply_overrides(&self, config: &mut CrossfadeConfig) {
        if let Some(window_ms) = self.window_ms {
            config.crossfade_window_ms = window_ms;
        }
        if let Some(fade_ms) = self.fade_ms {
            config.fade_duration_ms = fade_ms;
        }
        if let Some(step_ms) = self.step_ms {
            config.fade_step_interval_ms = step_ms;
        }
        if let Some(poll_ms) = self.poll_ms {
            config.position_poll_interval_ms = poll_ms;
        }
        if let Some(device) = &self.device {
            config.preferred_device = Some(device.clone());
        }
    }
}

/// Command line errors not caught by clap itself
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Missing argument: {argument}")]
    MissingArgument { argument: String },

    #[error("Invalid argument {argument}: got '{value}', expected {expected}")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: String,
    },
}
