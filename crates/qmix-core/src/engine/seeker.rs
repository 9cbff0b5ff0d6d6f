//! Variable-speed looping playback for one track
//!
//! A [`Seeker`] owns a track's decoded samples and a fractional read cursor.
//! Each rendered frame is reconstructed with a Lanczos (windowed-sinc)
//! kernel, then the cursor moves by `speed` frames and wraps around the end
//! of the track, so playback loops in both directions.
//!
//! ## References
//!
//! - CCRMA Stanford: Digital Audio Resampling (https://ccrma.stanford.edu/~jos/resample/)

use std::f64::consts::PI;

use crate::audio_file::SampleStore;
use crate::types::Sample;

/// Normalized sinc: sin(πx)/(πx), 1 at the origin
#[inline]
fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

/// Lanczos kernel of half-width `a`, zero outside (-a, a)
#[inline]
pub fn lanczos(x: f64, a: f64) -> f64 {
    if x.abs() >= a {
        0.0
    } else {
        sinc(x) * sinc(x / a)
    }
}

/// Wrap a (possibly negative) frame index into `[0, len)`
#[inline]
fn wrap_index(index: i64, len: usize) -> usize {
    index.rem_euclid(len as i64) as usize
}

/// Wrap a fractional position into `[0, len)`
///
/// `rem_euclid` can round a tiny negative value up to exactly `len`, which
/// would escape the range, so that case maps to 0.
#[inline]
fn wrap_position(position: f64, len: usize) -> f64 {
    let len = len as f64;
    let wrapped = position.rem_euclid(len);
    if wrapped >= len {
        0.0
    } else {
        wrapped
    }
}

/// Looping variable-speed reader for one track slot
pub struct Seeker {
    store: SampleStore,
    /// Fractional read offset, always in `[0, frame_count)`
    position: f64,
    half_width: usize,
    /// Kernel weights for the current frame (2 × half_width taps)
    weights: Vec<f64>,
}

impl Seeker {
    /// Create a seeker at position 0 with a kernel of half-width `half_width`
    pub fn new(store: SampleStore, half_width: usize) -> Self {
        let half_width = half_width.max(1);
        Self {
            store,
            position: 0.0,
            half_width,
            weights: vec![0.0; 2 * half_width],
        }
    }

    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.store.frame_count()
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.store.channel_count()
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.store.sample_rate()
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// Move the cursor to `position` (wrapped into range)
    pub fn seek(&mut self, position: f64) {
        if position.is_finite() {
            self.position = wrap_position(position, self.frame_count());
        }
    }

    /// Rewind to the start of the track
    ///
    /// Only used when the slot is bound to a different asset; deactivating a
    /// slot keeps its cursor.
    pub fn reset(&mut self) {
        self.position = 0.0;
    }

    /// Bind a new asset to this seeker and rewind
    pub fn replace_store(&mut self, store: SampleStore) -> SampleStore {
        self.reset();
        std::mem::replace(&mut self.store, store)
    }

    /// Account for `frames` frames of silence without moving the cursor
    ///
    /// An inactive track resumes exactly where it stopped.
    #[inline]
    pub fn noplay(&mut self, _frames: usize) {}

    /// Render `frames` interleaved frames at `speed` into a new buffer
    pub fn render(&mut self, speed: f64, frames: usize) -> Vec<Sample> {
        let mut out = vec![0.0; frames * self.channels()];
        self.render_into(speed, &mut out);
        out
    }

    /// Render `out.len() / channels` interleaved frames at `speed`
    ///
    /// The cursor advances by `speed` after every frame; negative speeds
    /// play backwards and 0 holds the current sample.
    pub fn render_into(&mut self, speed: f64, out: &mut [Sample]) {
        let channels = self.channels();
        debug_assert_eq!(out.len() % channels, 0, "partial frame in render buffer");
        debug_assert!(speed.is_finite(), "non-finite playback speed {}", speed);

        for frame in out.chunks_exact_mut(channels) {
            self.read_frame(frame);
            self.advance(speed);
        }
    }

    #[inline]
    fn advance(&mut self, speed: f64) {
        if speed.is_finite() {
            self.position = wrap_position(self.position + speed, self.frame_count());
        }
        debug_assert!(self.position >= 0.0 && self.position < self.frame_count() as f64);
    }

    /// Reconstruct one frame at the current cursor
    fn read_frame(&mut self, frame: &mut [Sample]) {
        let len = self.store.frame_count();
        let floor = self.position.floor();
        let frac = self.position - floor;
        let base = floor as i64;

        // The kernel is 1 at 0 and 0 at every other integer
        if frac == 0.0 {
            let index = base as usize;
            for (channel, out) in frame.iter_mut().enumerate() {
                *out = self.store.channel(channel)[index];
            }
            return;
        }

        let half_width = self.half_width as i64;
        let a = self.half_width as f64;
        for (weight, k) in self.weights.iter_mut().zip(1 - half_width..=half_width) {
            *weight = lanczos(frac - k as f64, a);
        }

        for (channel, out) in frame.iter_mut().enumerate() {
            let data = self.store.channel(channel);
            let acc: f64 = self
                .weights
                .iter()
                .zip(1 - half_width..=half_width)
                .map(|(weight, k)| data[wrap_index(base + k, len)] as f64 * weight)
                .sum();
            *out = acc as Sample;
        }
    }
}
