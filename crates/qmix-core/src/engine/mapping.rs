//! Control-to-audio mappings
//!
//! Pure functions translating marker state into playback parameters:
//! horizontal position → speed, marker area → gain.

use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};

/// Maps a normalized horizontal position to a playback speed
///
/// Four zones across `[0, 1]`:
///
/// ```text
///  -max ─┐
///        │ reverse ramp      forward ramp     dead zone      fast ramp
///  0 ────┼──────────────low──────────middle───────────high──────────── 1
///        -max .. 0          0 .. 1            1              1 .. max
/// ```
///
/// The dead zone keeps native speed while the marker jitters near the center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedMapper {
    /// Upper edge of the reverse zone (speed 0 here)
    pub low: f64,
    /// Start of the dead zone (speed 1 from here)
    pub middle: f64,
    /// End of the dead zone
    pub high: f64,
    /// Speed magnitude at both extremes
    pub max_speed: f64,
}

impl Default for SpeedMapper {
    fn default() -> Self {
        Self {
            low: 0.25,
            middle: 0.40,
            high: 0.75,
            max_speed: 3.0,
        }
    }
}

impl SpeedMapper {
    /// Playback speed for position `x`; values outside [0, 1] are clamped
    ///
    /// A NaN position holds the track (speed 0).
    pub fn speed(&self, x: f64) -> f64 {
        if x.is_nan() {
            return 0.0;
        }
        let x = x.clamp(0.0, 1.0);
        if x <= self.low {
            -self.max_speed * (self.low - x) / self.low
        } else if x <= self.middle {
            (x - self.low) / (self.middle - self.low)
        } else if x <= self.high {
            1.0
        } else {
            1.0 + (self.max_speed - 1.0) * (x - self.high) / (1.0 - self.high)
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        let ordered = 0.0 < self.low
            && self.low < self.middle
            && self.middle < self.high
            && self.high < 1.0;
        if !ordered {
            return Err(EngineError::InvalidConfig(format!(
                "speed thresholds must satisfy 0 < low < middle < high < 1 (got {}, {}, {})",
                self.low, self.middle, self.high
            )));
        }
        if !(self.max_speed >= 1.0 && self.max_speed.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "max_speed must be a finite value >= 1 (got {})",
                self.max_speed
            )));
        }
        Ok(())
    }
}

/// Maps a marker's normalized area to a linear gain in [0, 1]
///
/// A marker further from the camera than `min_size` is silent; one closer
/// than `max_size` plays at full gain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeMapper {
    pub min_size: f64,
    pub max_size: f64,
}

impl Default for VolumeMapper {
    fn default() -> Self {
        Self {
            min_size: 0.000138,
            max_size: 0.0005,
        }
    }
}

impl VolumeMapper {
    /// Gain for marker area `size`; a non-finite area is silent
    pub fn volume(&self, size: f64) -> f64 {
        if !size.is_finite() {
            return 0.0;
        }
        let clamped = size.clamp(self.min_size, self.max_size);
        (clamped - self.min_size) / (self.max_size - self.min_size)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(self.min_size >= 0.0 && self.min_size < self.max_size && self.max_size.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "volume sizes must satisfy 0 <= min_size < max_size (got {}, {})",
                self.min_size, self.max_size
            )));
        }
        Ok(())
    }
}
