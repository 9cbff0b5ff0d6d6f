//! Audio output for the qmix engine
//!
//! # Architecture
//!
//! The audio system keeps the device callback free of locks and
//! allocation:
//!
//! - **Tracker thread**: pushes control snapshots via a lock-free ringbuffer
//! - **Render thread**: owns the Mixer, renders one period per cycle
//! - **Audio thread**: owns a [`PlaybackFeed`], copies rendered periods out
//! - **Atomics**: diagnostics read via relaxed atomics (no locks)
//!
//! # Example Usage
//!
//! ```ignore
//! use qmix_core::audio::{start_audio_system, AudioConfig};
//! use qmix_core::engine::{Mixer, MixerConfig};
//!
//! let mixer_config = MixerConfig::default();
//! let mixer = Mixer::new(&mixer_config, stores)?;
//! let mut result = start_audio_system(&AudioConfig::default(), &mixer_config, mixer)?;
//!
//! // From the tracker
//! result.control_sender.push(snapshot).ok();
//!
//! // From a monitor
//! let stats = result.atomics.stats();
//! ```

mod backend;
mod callback;
mod config;
mod cpal_backend;
mod device;
mod error;

pub use backend::{start_audio_system, AudioHandle, AudioSystemResult};
pub use callback::PlaybackFeed;
pub use config::{AudioConfig, DeviceId};
pub use device::{default_output_device, find_device_by_id, list_output_devices, OutputDevice};
pub use error::{AudioError, AudioResult};
