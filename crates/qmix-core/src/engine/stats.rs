//! Lock-free diagnostics shared by the render thread and the device callback
//!
//! Neither real-time nor render code logs on its hot path. Both bump relaxed
//! counters here, and a monitor on a normal thread reads [`MixerStats`]
//! snapshots and logs the differences.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Counters and gauges for one running engine
#[derive(Debug, Default)]
pub struct MixerAtomics {
    /// Buffers rendered and handed to the device queue
    pub cycles_rendered: AtomicU64,
    /// Buffers the device callback copied to the hardware
    pub buffers_played: AtomicU64,
    /// Device periods filled with silence because no buffer was ready
    pub underruns: AtomicU64,
    /// Control snapshots dropped because the control queue was full
    pub snapshots_dropped: AtomicU64,
    /// Render cycles that reused the previous snapshot
    pub stale_cycles: AtomicU64,
    /// Render cycles that had to allocate because the recycle queue was empty
    pub fresh_buffers: AtomicU64,
    /// Played buffers dropped because the recycle queue was full
    pub buffers_discarded: AtomicU64,
    /// Rendered periods whose peak exceeded full scale
    pub clipped_periods: AtomicU64,
    /// Highest period peak since the last [`MixerAtomics::stats`] (f32 bits)
    peak: AtomicU32,
    /// Set when the device asked for a period of the wrong size
    period_mismatch: AtomicBool,
}

impl MixerAtomics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the peak of a rendered period
    ///
    /// Bits of non-negative floats order like the floats themselves, so
    /// `fetch_max` keeps the loudest period. NaN and negative input count as 0.
    #[inline]
    pub fn record_peak(&self, peak: f32) {
        let peak = if peak > 0.0 { peak } else { 0.0 };
        self.peak.fetch_max(peak.to_bits(), Ordering::Relaxed);
        if peak > 1.0 {
            Self::increment(&self.clipped_periods);
        }
    }

    /// Highest peak since the last read, without resetting it
    #[inline]
    pub fn peak(&self) -> f32 {
        f32::from_bits(self.peak.load(Ordering::Relaxed))
    }

    /// Read and reset the peak gauge
    #[inline]
    fn take_peak(&self) -> f32 {
        f32::from_bits(self.peak.swap(0, Ordering::Relaxed))
    }

    #[inline]
    pub fn flag_period_mismatch(&self) {
        self.period_mismatch.store(true, Ordering::Relaxed);
    }

    /// True once the device has delivered a period of the wrong size
    #[inline]
    pub fn period_mismatch(&self) -> bool {
        self.period_mismatch.load(Ordering::Relaxed)
    }

    /// Copy all counters (lock-free)
    ///
    /// The peak gauge restarts from 0, so each call reports the loudest
    /// period since the previous one.
    pub fn stats(&self) -> MixerStats {
        MixerStats {
            cycles_rendered: self.cycles_rendered.load(Ordering::Relaxed),
            buffers_played: self.buffers_played.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
            snapshots_dropped: self.snapshots_dropped.load(Ordering::Relaxed),
            stale_cycles: self.stale_cycles.load(Ordering::Relaxed),
            fresh_buffers: self.fresh_buffers.load(Ordering::Relaxed),
            buffers_discarded: self.buffers_discarded.load(Ordering::Relaxed),
            clipped_periods: self.clipped_periods.load(Ordering::Relaxed),
            peak: self.take_peak(),
        }
    }
}

/// Plain copy of [`MixerAtomics`] at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MixerStats {
    pub cycles_rendered: u64,
    pub buffers_played: u64,
    pub underruns: u64,
    pub snapshots_dropped: u64,
    pub stale_cycles: u64,
    pub fresh_buffers: u64,
    pub buffers_discarded: u64,
    pub clipped_periods: u64,
    /// Loudest period since the previous snapshot
    pub peak: f32,
}

impl MixerStats {
    /// Counter increments since `earlier`; the peak already covers the interval
    pub fn since(&self, earlier: &MixerStats) -> MixerStats {
        MixerStats {
            cycles_rendered: self.cycles_rendered.saturating_sub(earlier.cycles_rendered),
            buffers_played: self.buffers_played.saturating_sub(earlier.buffers_played),
            underruns: self.underruns.saturating_sub(earlier.underruns),
            snapshots_dropped: self.snapshots_dropped.saturating_sub(earlier.snapshots_dropped),
            stale_cycles: self.stale_cycles.saturating_sub(earlier.stale_cycles),
            fresh_buffers: self.fresh_buffers.saturating_sub(earlier.fresh_buffers),
            buffers_discarded: self.buffers_discarded.saturating_sub(earlier.buffers_discarded),
            clipped_periods: self.clipped_periods.saturating_sub(earlier.clipped_periods),
            peak: self.peak,
        }
    }

    /// True if any transient fault was recorded
    pub fn has_faults(&self) -> bool {
        self.underruns > 0
            || self.snapshots_dropped > 0
            || self.buffers_discarded > 0
            || self.clipped_periods > 0
    }
}
