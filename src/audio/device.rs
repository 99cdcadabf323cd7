use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, SupportedStreamConfig};
use log::warn;

use crate::error::AudioError;

/// Output device lookup for the players
pub struct DeviceManager {
    host: Host,
}

impl DeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Get a list of all available output device names
    pub fn list_devices(&self) -> Result<Vec<String>, AudioError> {
        let devices = self
            .host
            .output_devices()
            .map_err(|e| AudioError::InitializationFailed(format!("Failed to enumerate devices: {}", e)))?;

        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    /// Name of the system default output device
    pub fn default_device_name(&self) -> Option<String> {
        self.host.default_output_device().and_then(|d| d.name().ok())
    }

    /// Select the default audio device
    pub fn default_device(&self) -> Result<Device, AudioError> {
        self.host
            .default_output_device()
            .ok_or_else(|| AudioError::InitializationFailed("No default output device available".to_string()))
    }

    /// Select a device by name
    pub fn find_device(&self, name: &str) -> Result<Device, AudioError> {
        let mut devices = self
            .host
            .output_devices()
            .map_err(|e| AudioError::InitializationFailed(format!("Failed to enumerate devices: {}", e)))?;

        devices
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AudioError::DeviceNotFound {
                device: name.to_string(),
            })
    }

    /// Select a device by name with fallback to the default device
    pub fn select_device_with_fallback(&self, name: Option<&str>) -> Result<Device, AudioError> {
        match name {
            Some(name) => match self.find_device(name) {
                Ok(device) => Ok(device),
                Err(e) => {
                    warn!("{}; falling back to the default output device", e);
                    self.default_device()
                }
            },
            None => self.default_device(),
        }
    }

    /// Default stream configuration for a device
    pub fn output_config(device: &Device) -> Result<SupportedStreamConfig, AudioError> {
        device
            .default_output_config()
            .map_err(|e| AudioError::InitializationFailed(format!("Failed to get default config: {}", e)))
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
