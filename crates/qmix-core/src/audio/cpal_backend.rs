//! CPAL output stream
//!
//! The stream is opened in exactly the engine's format: f32 samples,
//! `MixerConfig::channels` interleaved channels, `MixerConfig::sample_rate`,
//! and a fixed period of `MixerConfig::frames_per_period` frames. Anything
//! the device cannot do is a startup error; there is no resampling or
//! channel remapping at this boundary.
//!
//! ```text
//! ┌──────────────────┐   rendered    ┌─────────────────────┐
//! │  Render Thread   │──────────────►│  CPAL Audio Thread  │
//! │  (owns Mixer)    │◄──────────────│  (owns PlaybackFeed)│
//! └──────────────────┘   recycled    └─────────────────────┘
//! ```

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BufferSize as CpalBufferSize, SampleFormat, SampleRate, Stream, StreamConfig,
    SupportedBufferSize, SupportedStreamConfigRange,
};

use super::callback::PlaybackFeed;
use super::error::{AudioError, AudioResult};
use crate::engine::MixerConfig;

/// Pick the stream config for `mixer` from what the device supports
///
/// Requires an f32 range with the exact channel count that covers the
/// sample rate, and a fixed period size inside the device's buffer range.
pub(super) fn select_stream_config(
    supported: &[SupportedStreamConfigRange],
    mixer: &MixerConfig,
) -> AudioResult<StreamConfig> {
    if supported.is_empty() {
        return Err(AudioError::ConfigError(
            "No supported output configurations".to_string(),
        ));
    }

    let channels = mixer.channels as u16;
    let frames = mixer.frames_per_period as u32;

    let candidates: Vec<_> = supported
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.channels() == channels)
        .filter(|c| {
            mixer.sample_rate >= c.min_sample_rate().0 && mixer.sample_rate <= c.max_sample_rate().0
        })
        .collect();
    if candidates.is_empty() {
        return Err(AudioError::ConfigError(format!(
            "device has no f32 output with {} channels at {}Hz",
            channels, mixer.sample_rate
        )));
    }

    let fits_period = |c: &&SupportedStreamConfigRange| match c.buffer_size() {
        SupportedBufferSize::Range { min, max } => frames >= *min && frames <= *max,
        SupportedBufferSize::Unknown => true,
    };
    if !candidates.iter().any(fits_period) {
        let ranges: Vec<String> = candidates
            .iter()
            .filter_map(|c| match c.buffer_size() {
                SupportedBufferSize::Range { min, max } => Some(format!("{}..={}", min, max)),
                SupportedBufferSize::Unknown => None,
            })
            .collect();
        return Err(AudioError::ConfigError(format!(
            "period of {} frames outside device range {}",
            frames,
            ranges.join(", ")
        )));
    }

    Ok(StreamConfig {
        channels,
        sample_rate: SampleRate(mixer.sample_rate),
        buffer_size: CpalBufferSize::Fixed(frames),
    })
}

/// Query the device and pick its stream config
pub(super) fn device_stream_config(
    device: &cpal::Device,
    mixer: &MixerConfig,
) -> AudioResult<StreamConfig> {
    let supported: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();
    select_stream_config(&supported, mixer)
}

/// Build (but don't start) the output stream around `feed`
pub(super) fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut feed: PlaybackFeed,
) -> AudioResult<Stream> {
    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| feed.fill(data),
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

/// Start playback of a built stream
pub(super) fn play(stream: &Stream) -> AudioResult<()> {
    stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(e.to_string()))
}

/// Pause a stream before it is dropped, logging failure
pub(super) fn pause(stream: &Stream) {
    if let Err(e) = stream.pause() {
        log::warn!("Failed to pause audio stream: {}", e);
    }
}
