//! Control bridge - tracker messages from stdin to the engine
//!
//! The tracker writes one JSON object per line:
//!
//! ```text
//! {"type":"snapshot","tracks":[{"active":true,"x":0.5,"y":0.5,"size":0.0004}]}
//! {"type":"load","slot":3,"path":"other.wav"}
//! {"type":"reset","slot":3}
//! ```
//!
//! Snapshot entries map to slots in order; slots not listed are inactive.
//! A bad line is logged and skipped, never fatal.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use qmix_core::engine::{CommandSender, ControlSender, MixerCommand, MixerConfig};
use qmix_core::{silent_snapshot, ControlSnapshot, Point, TrackControl, NUM_TRACKS};

use crate::config::TracksConfig;
use crate::loader::load_track;

/// One line of tracker input
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Full control state for every slot
    Snapshot { tracks: Vec<TrackMessage> },
    /// Bind a new asset to a slot
    Load { slot: usize, path: PathBuf },
    /// Rewind a slot
    Reset { slot: usize },
}

/// Control state of one slot as sent by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TrackMessage {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub size: f64,
}

impl TrackMessage {
    fn to_control(self, slot: usize) -> Result<TrackControl> {
        if !self.active {
            return Ok(TrackControl::inactive());
        }
        if !(self.x.is_finite() && self.y.is_finite() && self.size.is_finite()) {
            bail!("track {} has a non-finite position or size", slot);
        }
        Ok(TrackControl::active(Point::new(self.x, self.y), self.size))
    }
}

/// Build a full snapshot from the listed slots
pub fn to_snapshot(tracks: &[TrackMessage]) -> Result<ControlSnapshot> {
    if tracks.len() > NUM_TRACKS {
        bail!("snapshot lists {} tracks, at most {}", tracks.len(), NUM_TRACKS);
    }
    let mut snapshot = silent_snapshot();
    for (slot, track) in tracks.iter().enumerate() {
        snapshot[slot] = track.to_control(slot)?;
    }
    Ok(snapshot)
}

/// Forwards parsed tracker messages to the engine queues
pub struct ControlBridge {
    control: ControlSender,
    commands: CommandSender,
    tracks: TracksConfig,
    mixer: MixerConfig,
}

impl ControlBridge {
    pub fn new(
        control: ControlSender,
        commands: CommandSender,
        tracks: TracksConfig,
        mixer: MixerConfig,
    ) -> Self {
        Self {
            control,
            commands,
            tracks,
            mixer,
        }
    }

    /// Parse and apply one input line
    pub fn handle_line(&mut self, line: &str) -> Result<()> {
        let message: ControlMessage =
            serde_json::from_str(line).context("Malformed control message")?;
        self.handle(message)
    }

    pub fn handle(&mut self, message: ControlMessage) -> Result<()> {
        match message {
            ControlMessage::Snapshot { tracks } => {
                // A full control queue is counted and logged by the sender
                let _ = self.control.push(to_snapshot(&tracks)?);
            }
            ControlMessage::Load { slot, path } => {
                if slot >= NUM_TRACKS {
                    bail!("no track slot {}", slot);
                }
                let path = self.tracks.resolve(path);
                let store = load_track(slot, &path, &self.mixer)?;
                self.send(MixerCommand::ReplaceTrack {
                    slot,
                    store: Box::new(store),
                })?;
            }
            ControlMessage::Reset { slot } => {
                if slot >= NUM_TRACKS {
                    bail!("no track slot {}", slot);
                }
                self.send(MixerCommand::ResetTrack { slot })?;
            }
        }
        Ok(())
    }

    fn send(&mut self, cmd: MixerCommand) -> Result<()> {
        if self.commands.send(cmd).is_err() {
            bail!("command queue full");
        }
        Ok(())
    }

    /// Handle lines from `reader` until it closes
    pub fn run<R: BufRead>(mut self, reader: R) {
        log::info!("Control bridge reading tracker input");
        for (number, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::error!("Control input failed: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            if let Err(e) = self.handle_line(&line) {
                log::warn!("Control line {}: {:#}", number + 1, e);
            }
        }
        log::info!("Control input closed");
    }
}
