//! Output device discovery via cpal.

use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

use crate::Result;

/// Fallback when a device cannot report its default configuration.
const FALLBACK_SAMPLE_RATE: u32 = 48000;

/// Audio device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Whether the device supports audio input.
    pub is_input: bool,
    /// Whether the device supports audio output.
    pub is_output: bool,
    /// Default output channel count (0 for input-only devices).
    pub channels: u16,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

impl AudioDevice {
    /// Case-insensitive substring match on the device name.
    pub fn matches(&self, search: &str) -> bool {
        self.name.to_lowercase().contains(&search.to_lowercase())
    }
}

/// Extract device name via `description()` (cpal 0.17+).
pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Describe a device from its default output configuration.
pub(crate) fn describe_output(device: &Device) -> Option<AudioDevice> {
    let name = device_name(device).ok()?;
    let (channels, default_sample_rate) = device
        .default_output_config()
        .map(|c| (c.channels(), c.sample_rate()))
        .unwrap_or((2, FALLBACK_SAMPLE_RATE));
    Some(AudioDevice {
        name,
        is_input: device.default_input_config().is_ok(),
        is_output: true,
        channels,
        default_sample_rate,
    })
}

/// List every output-capable device on the default host.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices: Vec<AudioDevice> = Vec::new();

    match host.output_devices() {
        Ok(outputs) => {
            for device in outputs {
                let Some(info) = describe_output(&device) else {
                    continue;
                };
                if devices.iter().any(|d| d.name == info.name) {
                    continue;
                }
                devices.push(info);
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not enumerate output devices"),
    }

    tracing::debug!(count = devices.len(), "output devices enumerated");
    Ok(devices)
}

/// The default output device, if the host has one.
pub fn default_output_device() -> Result<Option<AudioDevice>> {
    let host = cpal::default_host();
    Ok(host.default_output_device().as_ref().and_then(describe_output))
}
