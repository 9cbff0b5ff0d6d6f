//! Lock-free queues between the tracker, the render thread and the device
//!
//! Every cross-thread hand-off is an `rtrb` single-producer single-consumer
//! ring buffer allocated once at startup:
//!
//! ```text
//! tracker ──ControlSnapshot──► render thread ──RenderBuffer──► device callback
//!    app ───MixerCommand─────►      ▲                                │
//!                                   └──────RenderBuffer (recycle)────┘
//! ```
//!
//! Push and pop never block. Blocking policy (the render thread waiting on
//! a full device queue) lives in the render loop, never here.

use std::sync::Arc;

use crate::audio_file::SampleStore;
use crate::types::{ControlSnapshot, RenderBuffer};

use super::stats::MixerAtomics;

/// Commands sent from the application to the render thread
///
/// Drained at the start of every render cycle, before the control snapshot
/// is read.
#[derive(Debug)]
pub enum MixerCommand {
    /// Bind a new asset to a slot and rewind it
    ///
    /// The store is boxed so the enum stays pointer-sized in the queue.
    ReplaceTrack {
        slot: usize,
        store: Box<SampleStore>,
    },
    /// Rewind a slot to the start of its asset
    ResetTrack { slot: usize },
}

/// Capacity of the command queue
pub const COMMAND_QUEUE_CAPACITY: usize = 16;

/// Create the command channel (application → render thread)
pub fn command_channel() -> (rtrb::Producer<MixerCommand>, rtrb::Consumer<MixerCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}

/// Create the control channel (tracker → render thread)
pub fn control_channel(
    capacity: usize,
) -> (rtrb::Producer<ControlSnapshot>, rtrb::Consumer<ControlSnapshot>) {
    rtrb::RingBuffer::new(capacity)
}

/// Create a buffer channel (render → device, or device → render for recycling)
pub fn buffer_channel(
    capacity: usize,
) -> (rtrb::Producer<RenderBuffer>, rtrb::Consumer<RenderBuffer>) {
    rtrb::RingBuffer::new(capacity)
}

/// Sending side of the control channel, owned by the tracker thread
pub struct ControlSender {
    producer: rtrb::Producer<ControlSnapshot>,
    atomics: Arc<MixerAtomics>,
}

impl ControlSender {
    pub fn new(producer: rtrb::Producer<ControlSnapshot>, atomics: Arc<MixerAtomics>) -> Self {
        Self { producer, atomics }
    }

    /// Queue a snapshot for the render thread (non-blocking)
    ///
    /// When the render thread is behind and the queue is full the snapshot
    /// is dropped, counted, and returned in `Err`. The render thread keeps
    /// using the newest snapshot it already has.
    pub fn push(&mut self, snapshot: ControlSnapshot) -> Result<(), ControlSnapshot> {
        self.producer.push(snapshot).map_err(|rtrb::PushError::Full(snapshot)| {
            MixerAtomics::increment(&self.atomics.snapshots_dropped);
            log::warn!("Control queue full, dropping tracker snapshot");
            snapshot
        })
    }

    /// Free slots left in the control queue
    pub fn slots(&self) -> usize {
        self.producer.slots()
    }
}

/// Sending side of the command channel
pub struct CommandSender {
    producer: rtrb::Producer<MixerCommand>,
}

impl CommandSender {
    pub fn new(producer: rtrb::Producer<MixerCommand>) -> Self {
        Self { producer }
    }

    /// Queue a command for the render thread (non-blocking)
    ///
    /// Returns the command in `Err` if the queue is full.
    pub fn send(&mut self, cmd: MixerCommand) -> Result<(), MixerCommand> {
        self.producer.push(cmd).map_err(|rtrb::PushError::Full(cmd)| cmd)
    }
}
