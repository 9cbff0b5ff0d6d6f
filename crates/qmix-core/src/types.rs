//! Common types for qmix
//!
//! This module contains the data contracts shared between the tracker, the
//! render thread and the device callback: per-slot control state, the fixed
//! control snapshot and the recyclable render buffer.

use basedrop::Owned;
use serde::{Deserialize, Serialize};

use crate::engine::gc_handle;

/// Number of track slots (one marker id per slot)
pub const NUM_TRACKS: usize = 7;

/// Audio sample type (32-bit float throughout the engine)
pub type Sample = f32;

/// Normalized 2D coordinate in camera space, both axes in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Control state for a single track slot
///
/// Produced by the marker tracker once per camera frame. `size` is the
/// marker's area as a fraction of the frame area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackControl {
    pub active: bool,
    pub position: Point,
    pub size: f64,
}

impl TrackControl {
    /// Slot with no marker in view
    pub const fn inactive() -> Self {
        Self {
            active: false,
            position: Point { x: 0.0, y: 0.0 },
            size: 0.0,
        }
    }

    /// Slot whose marker is visible at `position` with area `size`
    pub fn active(position: Point, size: f64) -> Self {
        Self {
            active: true,
            position,
            size,
        }
    }
}

/// Full control state for all slots, ordered by slot index
///
/// A plain array so snapshots cross the lock-free queue by value.
pub type ControlSnapshot = [TrackControl; NUM_TRACKS];

/// Snapshot with every slot inactive
pub const fn silent_snapshot() -> ControlSnapshot {
    [TrackControl::inactive(); NUM_TRACKS]
}

/// Interleaved block of one device period
///
/// Instances round-trip between the render thread and the device callback.
/// The storage is a `basedrop::Owned` so a buffer dropped on the audio
/// thread is freed by the collector thread instead.
pub struct RenderBuffer {
    samples: Owned<Vec<Sample>>,
}

impl RenderBuffer {
    /// Allocate a silent buffer of `len` interleaved samples
    pub fn silence(len: usize) -> Self {
        Self {
            samples: Owned::new(&gc_handle(), vec![0.0; len]),
        }
    }

    /// Resize to `len` samples and zero-fill
    ///
    /// Does not allocate when the buffer has been used with this length before.
    pub fn prepare(&mut self, len: usize) {
        self.samples.clear();
        self.samples.resize(len, 0.0);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    /// Absolute peak over all samples
    pub fn peak(&self) -> Sample {
        self.samples.iter().fold(0.0, |peak, s| peak.max(s.abs()))
    }
}

impl std::fmt::Debug for RenderBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderBuffer")
            .field("len", &self.samples.len())
            .finish()
    }
}
