//! Periodic engine diagnostics
//!
//! The render thread and device callback only bump counters. This monitor
//! runs on the main thread and logs what changed since its last tick.

use std::sync::Arc;

use qmix_core::engine::{MixerAtomics, MixerStats};

pub struct Monitor {
    atomics: Arc<MixerAtomics>,
    last: MixerStats,
}

impl Monitor {
    pub fn new(atomics: Arc<MixerAtomics>) -> Self {
        let last = atomics.stats();
        Self { atomics, last }
    }

    /// Log the counters accumulated since the previous tick
    pub fn tick(&mut self) -> MixerStats {
        let now = self.atomics.stats();
        let delta = now.since(&self.last);
        self.last = now;

        if delta.has_faults() {
            log::warn!("{}", describe(&delta));
        } else {
            log::debug!("{}", describe(&delta));
        }
        delta
    }
}

/// One-line summary of a stats delta
pub fn describe(delta: &MixerStats) -> String {
    let mut line = format!(
        "{} periods rendered, {} played, peak {:.2}",
        delta.cycles_rendered, delta.buffers_played, delta.peak
    );
    let counters = [
        (delta.underruns, "underruns"),
        (delta.snapshots_dropped, "snapshots dropped"),
        (delta.buffers_discarded, "buffers discarded"),
        (delta.fresh_buffers, "fresh buffers"),
        (delta.stale_cycles, "stale cycles"),
        (delta.clipped_periods, "clipped periods"),
    ];
    for (count, label) in counters {
        if count > 0 {
            line.push_str(&format!(", {} {}", count, label));
        }
    }
    line
}
