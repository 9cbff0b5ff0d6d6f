//! Mixer tunables
//!
//! Everything the engine needs to know up front: device period geometry,
//! queue depth, interpolation kernel width and the control mappings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};
use super::mapping::{SpeedMapper, VolumeMapper};
use super::mixer::check_store;
use crate::audio_file::SampleStore;

/// Default frames per device period
pub const DEFAULT_FRAMES_PER_PERIOD: usize = 128;

/// Default sample rate; every track asset must match it
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default interleaved channel count
pub const DEFAULT_CHANNELS: usize = 2;

/// Default capacity of each cross-thread queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 20;

/// Default Lanczos kernel half-width
pub const DEFAULT_KERNEL_HALF_WIDTH: usize = 3;

/// Widest Lanczos kernel accepted
pub const MAX_KERNEL_HALF_WIDTH: usize = 64;

/// Configuration for the mixer and its render thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Frames per device period (and per rendered buffer)
    pub frames_per_period: usize,
    /// Interleaved channels per frame
    pub channels: usize,
    /// Device and asset sample rate
    pub sample_rate: u32,
    /// Slots in each of the control, render and recycle queues
    pub queue_capacity: usize,
    /// Lanczos kernel half-width `W` (2W taps per sample)
    pub kernel_half_width: usize,
    /// Render tracks on the rayon pool instead of sequentially
    pub parallel_render: bool,
    pub speed: SpeedMapper,
    pub volume: VolumeMapper,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            frames_per_period: DEFAULT_FRAMES_PER_PERIOD,
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            kernel_half_width: DEFAULT_KERNEL_HALF_WIDTH,
            parallel_render: false,
            speed: SpeedMapper::default(),
            volume: VolumeMapper::default(),
        }
    }
}

impl MixerConfig {
    /// Interleaved samples per rendered buffer
    #[inline]
    pub fn period_len(&self) -> usize {
        self.frames_per_period * self.channels
    }

    /// Wall-clock duration of one period
    pub fn period_duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames_per_period as f64 / self.sample_rate as f64)
    }

    /// Latency added by a full render queue, in milliseconds
    pub fn queue_latency_ms(&self) -> f32 {
        (self.queue_capacity * self.frames_per_period) as f32 / self.sample_rate as f32 * 1000.0
    }

    /// Check all tunables before any thread is started
    pub fn validate(&self) -> EngineResult<()> {
        if self.frames_per_period == 0 || u32::try_from(self.frames_per_period).is_err() {
            return Err(EngineError::InvalidConfig(format!(
                "frames_per_period must be in 1..={} (got {})",
                u32::MAX,
                self.frames_per_period
            )));
        }
        if self.channels == 0 || u16::try_from(self.channels).is_err() {
            return Err(EngineError::InvalidConfig(format!(
                "channels must be in 1..={} (got {})",
                u16::MAX,
                self.channels
            )));
        }
        if self.sample_rate == 0 {
            return Err(EngineError::InvalidConfig(
                "sample_rate must be positive".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "queue_capacity must be positive".to_string(),
            ));
        }
        if self.kernel_half_width == 0 || self.kernel_half_width > MAX_KERNEL_HALF_WIDTH {
            return Err(EngineError::InvalidConfig(format!(
                "kernel_half_width must be in 1..={} (got {})",
                MAX_KERNEL_HALF_WIDTH, self.kernel_half_width
            )));
        }
        self.speed.validate()?;
        self.volume.validate()
    }

    /// Check that an asset for `slot` matches the configured format
    pub fn check_store(&self, slot: usize, store: &SampleStore) -> EngineResult<()> {
        check_store(self.channels, self.sample_rate, slot, store)
    }

    pub fn with_frames_per_period(mut self, frames: usize) -> Self {
        self.frames_per_period = frames;
        self
    }

    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_parallel_render(mut self, parallel: bool) -> Self {
        self.parallel_render = parallel;
        self
    }
}
