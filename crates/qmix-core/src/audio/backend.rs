//! Audio system startup and lifecycle
//!
//! [`start_audio_system`] turns a ready [`Mixer`] into running audio:
//!
//! 1. Open the device and check it can play the engine's format
//! 2. Wire the engine queues ([`EngineParts`])
//! 3. Start the render thread, which fills the device queue
//! 4. Build and start the output stream around the [`PlaybackFeed`]
//!
//! Shutdown runs in the opposite direction: stop the stream, signal the
//! render thread, join it, then release everything else.
//!
//! [`PlaybackFeed`]: super::PlaybackFeed

use std::sync::Arc;

use cpal::traits::DeviceTrait;
use cpal::Stream;

use super::config::AudioConfig;
use super::cpal_backend;
use super::device::{default_output_device, find_device_by_id};
use super::error::{AudioError, AudioResult};
use crate::engine::{
    CommandSender, ControlSender, EngineParts, Mixer, MixerAtomics, MixerConfig, RenderThread,
};

/// Result of starting the audio system
///
/// The senders are separate from the handle so they can move to the
/// threads that feed the engine while the handle stays with its owner.
pub struct AudioSystemResult {
    /// Handle to keep audio alive (drop to stop)
    pub handle: AudioHandle,
    /// Snapshot sender for the tracker (lock-free)
    pub control_sender: ControlSender,
    /// Track command sender (lock-free)
    pub command_sender: CommandSender,
    /// Engine diagnostics for lock-free reads
    pub atomics: Arc<MixerAtomics>,
    /// Sample rate of the audio system
    pub sample_rate: u32,
    /// Period size in frames
    pub frames_per_period: usize,
    /// Worst-case latency of a snapshot through the device queue
    pub latency_ms: f32,
}

/// Handle to the active audio system
///
/// Owns the output stream and the render thread. Dropping it performs
/// [`AudioHandle::shutdown`].
pub struct AudioHandle {
    stream: Option<Stream>,
    render: Option<RenderThread>,
    atomics: Arc<MixerAtomics>,
    device_name: String,
    period_len: usize,
}

impl AudioHandle {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Check for faults that must end playback
    pub fn check_health(&self) -> AudioResult<()> {
        if self.atomics.period_mismatch() {
            return Err(AudioError::PeriodMismatch {
                expected: self.period_len,
            });
        }
        if self.render.as_ref().is_some_and(|r| !r.is_running()) {
            return Err(AudioError::RenderStopped);
        }
        Ok(())
    }

    /// Stop the stream, then stop and join the render thread
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(stream) = self.stream.take() {
            cpal_backend::pause(&stream);
            drop(stream);
            log::info!("Audio stream stopped");
        }
        if let Some(mut render) = self.render.take() {
            render.join();
            let stats = self.atomics.stats();
            log::info!(
                "Engine stopped: {} periods played, {} underruns",
                stats.buffers_played,
                stats.underruns
            );
        }
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the audio system with the given configuration
///
/// `mixer` must have been built from `mixer_config`. Every failure here
/// happens before the stream plays and leaves no thread running.
pub fn start_audio_system(
    config: &AudioConfig,
    mixer_config: &MixerConfig,
    mixer: Mixer,
) -> AudioResult<AudioSystemResult> {
    let device = match &config.device {
        Some(id) => find_device_by_id(id)?,
        None => default_output_device()?,
    };
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Using audio device: {}", device_name);

    let stream_config = cpal_backend::device_stream_config(&device, mixer_config)?;
    let latency_ms = mixer_config.queue_latency_ms();
    log::info!(
        "Audio config: {} channels, {}Hz, {} frames per period, {} queued periods (~{:.1}ms)",
        stream_config.channels,
        mixer_config.sample_rate,
        mixer_config.frames_per_period,
        mixer_config.queue_capacity,
        latency_ms
    );

    let EngineParts {
        render,
        playback,
        control,
        commands,
        atomics,
    } = EngineParts::new(mixer_config, mixer)?;

    // Dropping a RenderThread joins it, so early returns below stop it
    let render = RenderThread::spawn(render)?;

    let stream = cpal_backend::build_output_stream(&device, &stream_config, playback)?;
    cpal_backend::play(&stream)?;
    log::info!("Audio stream started");

    let handle = AudioHandle {
        stream: Some(stream),
        render: Some(render),
        atomics: atomics.clone(),
        device_name,
        period_len: mixer_config.period_len(),
    };

    Ok(AudioSystemResult {
        handle,
        control_sender: control,
        command_sender: commands,
        atomics,
        sample_rate: mixer_config.sample_rate,
        frames_per_period: mixer_config.frames_per_period,
        latency_ms,
    })
}
