use thiserror::Error;

use crate::models::SlotRole;

/// Main player error type
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CLI parse error: {0}")]
    Parse(#[from] crate::cli::ParseError),
}

impl PlayerError {
    /// Get user-friendly error message with suggested solutions
    pub fn user_message(&self) -> String {
        match self {
            PlayerError::Session(err) => err.user_message(),
            PlayerError::Audio(err) => err.user_message(),
            PlayerError::Config(err) => err.user_message(),
            PlayerError::Parse(err) => format!("Command error: {}", err),
        }
    }

    /// Get suggested recovery actions for the error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PlayerError::Session(err) => err.recovery_suggestions(),
            PlayerError::Audio(err) => err.recovery_suggestions(),
            PlayerError::Config(err) => err.recovery_suggestions(),
            PlayerError::Parse(_) => vec!["Run with --help to see the accepted arguments".to_string()],
        }
    }

    /// Check if this error allows for automatic recovery
    pub fn is_recoverable(&self) -> bool {
        match self {
            PlayerError::Session(err) => err.is_recoverable(),
            PlayerError::Audio(err) => err.is_recoverable(),
            PlayerError::Config(err) => err.is_recoverable(),
            PlayerError::Parse(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PlayerError::Session(SessionError::InvalidInput { .. }) => ErrorSeverity::Error,
            PlayerError::Session(SessionError::Decoder { .. }) => ErrorSeverity::Error,
            PlayerError::Audio(AudioError::DeviceNotFound { .. }) => ErrorSeverity::Warning,
            PlayerError::Audio(AudioError::Released) => ErrorSeverity::Info,
            PlayerError::Audio(_) => ErrorSeverity::Critical,
            PlayerError::Config(_) => ErrorSeverity::Warning,
            PlayerError::Parse(_) => ErrorSeverity::Info,
        }
    }
}

/// Error severity levels for logging and user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
            ErrorSeverity::Critical => log::Level::Error,
        }
    }
}

/// Errors surfaced synchronously from starting a playback session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid {slot} track: {reason}")]
    InvalidInput { slot: SlotRole, reason: String },

    #[error("Failed to prepare {slot} track: {source}")]
    Decoder {
        slot: SlotRole,
        #[source]
        source: AudioError,
    },
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            SessionError::InvalidInput { slot, reason } => {
                format!("Cannot play the {} track: {}", slot, reason)
            }
            SessionError::Decoder { slot, source } => {
                format!("The {} track could not be opened for playback: {}", slot, source.user_message())
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            SessionError::InvalidInput { .. } => vec![
                "Select both tracks before starting playback".to_string(),
                "Check that both file paths exist and are readable".to_string(),
            ],
            SessionError::Decoder { source, .. } => source.recovery_suggestions(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            SessionError::InvalidInput { .. } => false, // Requires different input
            SessionError::Decoder { source, .. } => source.is_recoverable(),
        }
    }

    /// Which slot the failure belongs to
    pub fn slot(&self) -> SlotRole {
        match self {
            SessionError::InvalidInput { slot, .. } | SessionError::Decoder { slot, .. } => *slot,
        }
    }
}

/// Errors raised by an `AudioPlayer` implementation
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Source not found: {locator}")]
    SourceNotFound { locator: String },

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Device not found: {device}")]
    DeviceNotFound { device: String },

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Audio initialization failed: {0}")]
    InitializationFailed(String),

    #[error("No track loaded")]
    NotLoaded,

    #[error("Player has been released")]
    Released,
}

impl AudioError {
    pub fn user_message(&self) -> String {
        match self {
            AudioError::SourceNotFound { locator } => {
                format!("Cannot find audio source '{}'", locator)
            }
            AudioError::Decode(msg) => {
                format!("Failed to decode audio data: {}", msg)
            }
            AudioError::UnsupportedFormat { format } => {
                format!("Audio format '{}' is not supported", format)
            }
            AudioError::DeviceNotFound { device } => {
                format!("Audio device '{}' is not available or has been disconnected", device)
            }
            AudioError::StreamError(msg) => {
                format!("Audio playback interrupted: {}", msg)
            }
            AudioError::InitializationFailed(msg) => {
                format!("Failed to initialize audio system: {}", msg)
            }
            AudioError::NotLoaded => "The player has no track loaded".to_string(),
            AudioError::Released => "The player was already released".to_string(),
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            AudioError::SourceNotFound { .. } => vec![
                "Check that the file path is correct".to_string(),
                "Try using an absolute path instead of a relative path".to_string(),
            ],
            AudioError::Decode(_) => vec![
                "Try re-downloading or re-copying the file".to_string(),
                "Verify the file is not corrupted".to_string(),
            ],
            AudioError::UnsupportedFormat { .. } => vec![
                "Supported formats: FLAC, WAV, MP3, OGG/Vorbis, AAC/M4A".to_string(),
                "Convert the file to a supported format".to_string(),
            ],
            AudioError::DeviceNotFound { .. } => vec![
                "Check that your audio device is connected and powered on".to_string(),
                "Remove preferred_device from the configuration to use the default device".to_string(),
            ],
            AudioError::StreamError(_) => vec![
                "Check audio device connections".to_string(),
                "Restart playback".to_string(),
            ],
            AudioError::InitializationFailed(_) => vec![
                "Check that no other application is using exclusive audio access".to_string(),
                "Verify audio drivers are properly installed".to_string(),
            ],
            AudioError::NotLoaded | AudioError::Released => vec![
                "Restart playback".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            AudioError::SourceNotFound { .. } => false,
            AudioError::Decode(_) => false,
            AudioError::UnsupportedFormat { .. } => false,
            AudioError::DeviceNotFound { .. } => true, // Can fall back to default device
            AudioError::StreamError(_) => true,
            AudioError::InitializationFailed(_) => true,
            AudioError::NotLoaded => true,
            AudioError::Released => true,
        }
    }
}

/// Internal crossfade errors. Logged by the session actor, never surfaced to the caller.
#[derive(Debug, Error)]
pub enum CrossfadeError {
    #[error("Stale reference to released {role} slot")]
    StaleReference { role: SlotRole },

    #[error("{role} player failed: {source}")]
    Player {
        role: SlotRole,
        #[source]
        source: AudioError,
    },
}

impl CrossfadeError {
    pub fn role(&self) -> SlotRole {
        match self {
            CrossfadeError::StaleReference { role } | CrossfadeError::Player { role, .. } => *role,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, CrossfadeError::StaleReference { .. })
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ConfigDirNotFound => {
                "Cannot find or create configuration directory".to_string()
            }
            ConfigError::Invalid(msg) => {
                format!("Crossfade settings are inconsistent: {}", msg)
            }
            ConfigError::IoError(err) => {
                format!("Cannot access configuration file: {}", err)
            }
            ConfigError::SerializationError(_) => {
                "Failed to save configuration settings".to_string()
            }
            ConfigError::DeserializationError(_) => {
                "Configuration file is corrupted or has invalid format".to_string()
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::ConfigDirNotFound => vec![
                "Check that you have write permissions to your home directory".to_string(),
                "Try creating the directory manually: ~/.config/crossfade-player/".to_string(),
            ],
            ConfigError::Invalid(_) => vec![
                "Step and poll intervals must be greater than zero".to_string(),
                "The fade duration must be at least one step interval".to_string(),
            ],
            ConfigError::IoError(_) => vec![
                "Check file permissions for the configuration directory".to_string(),
                "Ensure the disk is not full".to_string(),
            ],
            ConfigError::SerializationError(_) => vec![
                "Configuration will use default values".to_string(),
            ],
            ConfigError::DeserializationError(_) => vec![
                "Delete the configuration file to reset to defaults".to_string(),
                "Check the configuration file format manually".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            ConfigError::ConfigDirNotFound => true, // Can use defaults
            ConfigError::Invalid(_) => false,
            ConfigError::IoError(_) => true,
            ConfigError::SerializationError(_) => true,
            ConfigError::DeserializationError(_) => true,
        }
    }
}
