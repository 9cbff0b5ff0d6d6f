//! Device callback adapter
//!
//! [`PlaybackFeed`] is moved into the cpal output closure and owned by the
//! device thread alone. Per period it pops one rendered buffer, copies it
//! out, and returns the storage to the render thread. It never allocates,
//! locks, or logs.

use std::sync::Arc;

use crate::engine::MixerAtomics;
use crate::types::{RenderBuffer, Sample};

/// Device-side ends of the buffer queues
pub struct PlaybackFeed {
    rendered_rx: rtrb::Consumer<RenderBuffer>,
    recycle_tx: rtrb::Producer<RenderBuffer>,
    atomics: Arc<MixerAtomics>,
    /// Interleaved samples the device must ask for each callback
    period_len: usize,
    /// Debug-assert on a period mismatch in addition to flagging it
    assert_period: bool,
}

impl PlaybackFeed {
    pub fn new(
        rendered_rx: rtrb::Consumer<RenderBuffer>,
        recycle_tx: rtrb::Producer<RenderBuffer>,
        atomics: Arc<MixerAtomics>,
        period_len: usize,
    ) -> Self {
        Self {
            rendered_rx,
            recycle_tx,
            atomics,
            period_len,
            assert_period: true,
        }
    }

    /// Only flag a period mismatch, never debug-assert on it
    #[cfg(test)]
    fn flag_only(mut self) -> Self {
        self.assert_period = false;
        self
    }

    #[inline]
    pub fn period_len(&self) -> usize {
        self.period_len
    }

    /// Fill one hardware period
    ///
    /// A period of the wrong size is a fatal configuration error: the
    /// output is silenced and the mismatch flag raised for the owning thread.
    pub fn fill(&mut self, out: &mut [Sample]) {
        if out.len() != self.period_len {
            out.fill(0.0);
            self.atomics.flag_period_mismatch();
            debug_assert!(
                !self.assert_period,
                "device period of {} samples, engine renders {}",
                out.len(),
                self.period_len
            );
            return;
        }

        let buffer = match self.rendered_rx.pop() {
            Ok(buffer) => buffer,
            Err(_) => {
                out.fill(0.0);
                MixerAtomics::increment(&self.atomics.underruns);
                return;
            }
        };

        let samples = buffer.as_slice();
        debug_assert_eq!(samples.len(), out.len(), "rendered buffer is not one period");
        let n = samples.len().min(out.len());
        out[..n].copy_from_slice(&samples[..n]);
        out[n..].fill(0.0);
        MixerAtomics::increment(&self.atomics.buffers_played);

        // A full pool drops the buffer here; basedrop frees it off-thread
        if self.recycle_tx.push(buffer).is_err() {
            MixerAtomics::increment(&self.atomics.buffers_discarded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer_channel;

    struct Harness {
        feed: PlaybackFeed,
        rendered_tx: rtrb::Producer<RenderBuffer>,
        recycle_rx: rtrb::Consumer<RenderBuffer>,
        atomics: Arc<MixerAtomics>,
    }

    fn harness(period_len: usize, recycle_capacity: usize) -> Harness {
        let (rendered_tx, rendered_rx) = buffer_channel(4);
        let (recycle_tx, recycle_rx) = buffer_channel(recycle_capacity);
        let atomics = Arc::new(MixerAtomics::new());
        Harness {
            feed: PlaybackFeed::new(rendered_rx, recycle_tx, atomics.clone(), period_len),
            rendered_tx,
            recycle_rx,
            atomics,
        }
    }

    fn ramp(len: usize) -> RenderBuffer {
        let mut buffer = RenderBuffer::silence(len);
        for (i, s) in buffer.as_mut_slice().iter_mut().enumerate() {
            *s = i as Sample * 0.01;
        }
        buffer
    }

    #[test]
    fn test_plays_and_recycles() {
        let mut h = harness(8, 4);
        h.rendered_tx.push(ramp(8)).unwrap();

        let mut out = [1.0; 8];
        h.feed.fill(&mut out);
        assert!((out[3] - 0.03).abs() < 1e-6);

        let recycled = h.recycle_rx.pop().unwrap();
        assert_eq!(recycled.len(), 8);
        let stats = h.atomics.stats();
        assert_eq!(stats.buffers_played, 1);
        assert_eq!(stats.underruns, 0);
    }

    #[test]
    fn test_underrun_plays_silence() {
        let mut h = harness(8, 4);
        let mut out = [0.5; 8];
        h.feed.fill(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(h.atomics.stats().underruns, 1);

        // Playback continues once buffers arrive again
        h.rendered_tx.push(ramp(8)).unwrap();
        h.feed.fill(&mut out);
        assert_eq!(out[1], 0.01);
        assert_eq!(h.atomics.stats().underruns, 1);
    }

    #[test]
    fn test_full_recycle_queue_discards() {
        let mut h = harness(4, 1);
        h.rendered_tx.push(ramp(4)).unwrap();
        h.rendered_tx.push(ramp(4)).unwrap();

        let mut out = [0.0; 4];
        h.feed.fill(&mut out);
        h.feed.fill(&mut out);

        let stats = h.atomics.stats();
        assert_eq!(stats.buffers_played, 2);
        assert_eq!(stats.buffers_discarded, 1);
        assert!(h.recycle_rx.pop().is_ok());
        assert!(h.recycle_rx.pop().is_err());
    }

    #[test]
    fn test_period_mismatch_is_flagged() {
        let mut h = harness(8, 4);
        h.feed = h.feed.flag_only();
        h.rendered_tx.push(ramp(8)).unwrap();

        let mut out = [0.7; 6];
        h.feed.fill(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(h.atomics.period_mismatch());
        // The rendered buffer stays queued
        assert_eq!(h.atomics.stats().buffers_played, 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "device period")]
    fn test_period_mismatch_asserts_in_debug() {
        let mut h = harness(8, 4);
        let mut out = [0.0; 6];
        h.feed.fill(&mut out);
    }
}
