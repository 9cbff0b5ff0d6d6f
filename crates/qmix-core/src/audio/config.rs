//! Output device selection
//!
//! Stream format (channels, sample rate, period size) is owned by
//! [`MixerConfig`](crate::engine::MixerConfig) because the engine renders
//! in exactly that format. This config only picks the device.

use serde::{Deserialize, Serialize};

/// Audio device identifier
///
/// The host (ALSA, JACK, CoreAudio, ...) disambiguates devices with the same
/// name on systems that expose several backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    /// Host name as listed by `qmix-player --list-devices`; None searches all hosts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: Some(host.into()),
        }
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.host {
            Some(host) => write!(f, "[{}] {}", host, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Configuration for the audio backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device (None = default device of the default host)
    pub device: Option<DeviceId>,
}

impl AudioConfig {
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }
}
