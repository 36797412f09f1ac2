//! Audio device enumeration via the default cpal host.

use cpal::traits::{DeviceTrait, HostTrait};

use loop_pedal_core::models::audio_models::{AudioDevice, PortDirection};
use loop_pedal_core::models::error::LoopError;

/// Lists the input and output devices of the default cpal host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List capture (input) devices.
    pub fn list_capture_devices(&self) -> Result<Vec<AudioDevice>, LoopError> {
        let default_name = self.host.default_input_device().and_then(|d| d.name().ok());
        let devices = self.host.input_devices().map_err(|e| LoopError::DeviceOpen {
            direction: PortDirection::Capture,
            reason: format!("failed to enumerate input devices: {e}"),
        })?;
        Ok(describe(devices, PortDirection::Capture, default_name.as_deref()))
    }

    /// List playback (output) devices.
    pub fn list_playback_devices(&self) -> Result<Vec<AudioDevice>, LoopError> {
        let default_name = self.host.default_output_device().and_then(|d| d.name().ok());
        let devices = self.host.output_devices().map_err(|e| LoopError::DeviceOpen {
            direction: PortDirection::Playback,
            reason: format!("failed to enumerate output devices: {e}"),
        })?;
        Ok(describe(devices, PortDirection::Playback, default_name.as_deref()))
    }

    /// Log every device, marking the host defaults.
    pub fn log_devices(&self) {
        for (label, devices) in [
            ("Capture", self.list_capture_devices()),
            ("Playback", self.list_playback_devices()),
        ] {
            match devices {
                Ok(devices) => {
                    for device in devices {
                        log::info!(
                            "{} device: {}{}",
                            label,
                            device.name,
                            if device.is_default { " (default)" } else { "" }
                        );
                    }
                }
                Err(e) => log::warn!("{}", e),
            }
        }
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(
    devices: impl Iterator<Item = cpal::Device>,
    direction: PortDirection,
    default_name: Option<&str>,
) -> Vec<AudioDevice> {
    devices
        .filter_map(|d| d.name().ok())
        .map(|name| AudioDevice {
            is_default: default_name == Some(name.as_str()),
            name,
            direction,
        })
        .collect()
}
