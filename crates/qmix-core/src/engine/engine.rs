//! Engine wiring - queues, render loop and device feed for one mixer
//!
//! [`EngineParts::new`] allocates every queue once and splits the ends
//! between the threads that will own them. Nothing here touches a device,
//! so the whole pipeline can be driven from tests.

use std::sync::Arc;

use super::command::{
    buffer_channel, command_channel, control_channel, CommandSender, ControlSender,
};
use super::config::MixerConfig;
use super::error::{EngineError, EngineResult};
use super::gc::gc_handle;
use super::mixer::Mixer;
use super::render::{RenderEndpoints, RenderLoop};
use super::stats::MixerAtomics;
use crate::audio::PlaybackFeed;

/// One engine split by owning thread
pub struct EngineParts {
    /// Moved onto the render thread
    pub render: RenderLoop,
    /// Moved into the device callback
    pub playback: PlaybackFeed,
    /// Kept by the tracker
    pub control: ControlSender,
    /// Kept by the application
    pub commands: CommandSender,
    pub atomics: Arc<MixerAtomics>,
}

impl EngineParts {
    /// Wire `mixer` into a fresh set of queues sized by `config`
    pub fn new(config: &MixerConfig, mixer: Mixer) -> EngineResult<Self> {
        config.validate()?;
        if mixer.period_len() != config.period_len() {
            return Err(EngineError::InvalidConfig(format!(
                "mixer renders {} samples per period, config expects {}",
                mixer.period_len(),
                config.period_len()
            )));
        }

        // Start the collector before any audio thread can drop a buffer
        gc_handle();

        let atomics = Arc::new(MixerAtomics::new());
        let (control_tx, control_rx) = control_channel(config.queue_capacity);
        let (command_tx, command_rx) = command_channel();
        let (output_tx, output_rx) = buffer_channel(config.queue_capacity);
        let (recycle_tx, recycle_rx) = buffer_channel(config.queue_capacity);

        log::debug!(
            "Engine queues: {} periods (~{:.1}ms) between render and device",
            config.queue_capacity,
            config.queue_latency_ms()
        );

        let endpoints = RenderEndpoints {
            control_rx,
            command_rx,
            output_tx,
            recycle_rx,
        };

        Ok(Self {
            render: RenderLoop::new(mixer, endpoints, atomics.clone(), config.period_duration()),
            playback: PlaybackFeed::new(output_rx, recycle_tx, atomics.clone(), config.period_len()),
            control: ControlSender::new(control_tx, atomics.clone()),
            commands: CommandSender::new(command_tx),
            atomics,
        })
    }
}
