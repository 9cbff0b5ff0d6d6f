//! Render thread - produces one output period per cycle
//!
//! The render thread sits between the tracker and the device callback. It
//! owns the [`Mixer`] (and therefore every seeker) exclusively, so no seeker
//! state is ever shared across threads.
//!
//! Each cycle:
//! 1. Apply pending [`MixerCommand`]s
//! 2. Take the newest control snapshot (or keep the previous one)
//! 3. Take a recycled buffer (or allocate when the pool is dry)
//! 4. Mix all slots into it
//! 5. Hand it to the device queue, waiting while that queue is full
//!
//! Step 5 is the only place the engine waits. It never drops a buffer, so
//! the render thread runs exactly as fast as the device consumes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::utils::Backoff;

use super::command::MixerCommand;
use super::error::EngineResult;
use super::mixer::Mixer;
use super::stats::MixerAtomics;
use crate::types::{silent_snapshot, ControlSnapshot, RenderBuffer};

/// Engine-side ends of the cross-thread queues
pub struct RenderEndpoints {
    pub control_rx: rtrb::Consumer<ControlSnapshot>,
    pub command_rx: rtrb::Consumer<MixerCommand>,
    pub output_tx: rtrb::Producer<RenderBuffer>,
    pub recycle_rx: rtrb::Consumer<RenderBuffer>,
}

/// The render loop state, moved onto the render thread
pub struct RenderLoop {
    mixer: Mixer,
    /// Newest snapshot seen; reused while the tracker is silent
    controls: ControlSnapshot,
    endpoints: RenderEndpoints,
    atomics: Arc<MixerAtomics>,
    stop: Arc<AtomicBool>,
    /// Sleep between polls of a full device queue
    drain_wait: Duration,
}

impl RenderLoop {
    pub fn new(
        mixer: Mixer,
        endpoints: RenderEndpoints,
        atomics: Arc<MixerAtomics>,
        period: Duration,
    ) -> Self {
        Self {
            mixer,
            controls: silent_snapshot(),
            endpoints,
            atomics,
            stop: Arc::new(AtomicBool::new(false)),
            drain_wait: period / 4,
        }
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    /// Shared stop flag, checked once per cycle and while waiting
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Apply all queued commands
    pub fn process_commands(&mut self) {
        while let Ok(cmd) = self.endpoints.command_rx.pop() {
            match cmd {
                MixerCommand::ReplaceTrack { slot, store } => {
                    match self.mixer.replace_track(slot, *store) {
                        Ok(()) => log::info!("Track {} reassigned", slot),
                        Err(e) => log::error!("Rejected track replacement: {}", e),
                    }
                }
                MixerCommand::ResetTrack { slot } => {
                    if !self.mixer.reset_track(slot) {
                        log::warn!("Ignoring reset of unknown track slot {}", slot);
                    }
                }
            }
        }
    }

    /// Drain the control queue, keeping only the newest snapshot
    ///
    /// Returns false when nothing new arrived and the previous snapshot is
    /// reused.
    fn update_controls(&mut self) -> bool {
        let mut fresh = false;
        while let Ok(snapshot) = self.endpoints.control_rx.pop() {
            self.controls = snapshot;
            fresh = true;
        }
        if !fresh {
            MixerAtomics::increment(&self.atomics.stale_cycles);
        }
        fresh
    }

    /// A zeroed buffer of one period, recycled when possible
    fn take_buffer(&mut self) -> RenderBuffer {
        let len = self.mixer.period_len();
        match self.endpoints.recycle_rx.pop() {
            Ok(mut buffer) => {
                buffer.prepare(len);
                buffer
            }
            Err(_) => {
                MixerAtomics::increment(&self.atomics.fresh_buffers);
                RenderBuffer::silence(len)
            }
        }
    }

    /// Steps 1-4: produce one mixed period without delivering it
    pub fn render_period(&mut self) -> RenderBuffer {
        self.process_commands();
        self.update_controls();

        let mut buffer = self.take_buffer();
        self.mixer.mix(&self.controls, buffer.as_mut_slice());
        self.atomics.record_peak(buffer.peak());
        buffer
    }

    /// Step 5: push to the device queue, waiting while it is full
    ///
    /// Spins briefly, then parks for a fraction of a period between polls.
    /// The device callback never signals; it only pops. Returns false if
    /// the stop flag was raised while waiting.
    fn deliver(&mut self, mut buffer: RenderBuffer) -> bool {
        let backoff = Backoff::new();
        loop {
            match self.endpoints.output_tx.push(buffer) {
                Ok(()) => {
                    MixerAtomics::increment(&self.atomics.cycles_rendered);
                    return true;
                }
                Err(rtrb::PushError::Full(returned)) => {
                    buffer = returned;
                    if self.stop.load(Ordering::Acquire) {
                        return false;
                    }
                    if backoff.is_completed() {
                        thread::park_timeout(self.drain_wait);
                    } else {
                        backoff.snooze();
                    }
                }
            }
        }
    }

    /// Run one full cycle; returns false if stopped mid-delivery
    pub fn run_cycle(&mut self) -> bool {
        let buffer = self.render_period();
        self.deliver(buffer)
    }

    /// Loop until the stop flag is raised
    pub fn run(mut self) {
        log::info!(
            "Render thread started ({} frames per period)",
            self.mixer.frames_per_period()
        );
        while !self.stop.load(Ordering::Acquire) {
            if !self.run_cycle() {
                break;
            }
        }
        log::info!(
            "Render thread stopped after {} cycles",
            self.atomics.stats().cycles_rendered
        );
    }
}

/// Handle to the running render thread
///
/// Dropping the handle stops and joins the thread.
pub struct RenderThread {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl RenderThread {
    /// Move `render_loop` onto a new thread and start it
    pub fn spawn(render_loop: RenderLoop) -> EngineResult<Self> {
        let stop = render_loop.stop_flag();
        let handle = thread::Builder::new()
            .name("qmix-render".to_string())
            .spawn(move || render_loop.run())?;
        Ok(Self {
            handle: Some(handle),
            stop,
        })
    }

    /// Ask the thread to exit at its next check
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = &self.handle {
            handle.thread().unpark();
        }
    }

    /// Stop the thread and wait for it to exit
    pub fn join(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Render thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::command::{buffer_channel, command_channel, control_channel};
    use crate::engine::config::MixerConfig;
    use crate::engine::mixer::tests::{slot_store, test_stores};
    use crate::types::{Point, TrackControl};
    use std::time::Instant;

    struct Harness {
        render: RenderLoop,
        control_tx: rtrb::Producer<ControlSnapshot>,
        command_tx: rtrb::Producer<MixerCommand>,
        output_rx: rtrb::Consumer<RenderBuffer>,
        recycle_tx: rtrb::Producer<RenderBuffer>,
        atomics: Arc<MixerAtomics>,
    }

    fn harness(config: &MixerConfig) -> Harness {
        let mixer = Mixer::new(config, test_stores(config)).unwrap();
        let (control_tx, control_rx) = control_channel(config.queue_capacity);
        let (command_tx, command_rx) = command_channel();
        let (output_tx, output_rx) = buffer_channel(config.queue_capacity);
        let (recycle_tx, recycle_rx) = buffer_channel(config.queue_capacity);
        let atomics = Arc::new(MixerAtomics::new());
        let endpoints = RenderEndpoints {
            control_rx,
            command_rx,
            output_tx,
            recycle_rx,
        };
        Harness {
            render: RenderLoop::new(mixer, endpoints, atomics.clone(), config.period_duration()),
            control_tx,
            command_tx,
            output_rx,
            recycle_tx,
            atomics,
        }
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    fn center_snapshot(slot: usize, size: f64) -> ControlSnapshot {
        let mut snapshot = silent_snapshot();
        snapshot[slot] = TrackControl::active(Point::new(0.5, 0.5), size);
        snapshot
    }

    #[test]
    fn test_cycle_uses_newest_snapshot() {
        let config = MixerConfig::default();
        let mut h = harness(&config);

        h.control_tx.push(center_snapshot(1, config.volume.max_size)).unwrap();
        h.control_tx.push(center_snapshot(2, config.volume.max_size)).unwrap();
        assert!(h.render.run_cycle());

        let buffer = h.output_rx.pop().unwrap();
        assert_eq!(buffer.len(), config.period_len());
        // Only slot 2 from the newest snapshot played
        assert_eq!(buffer.as_slice()[0], 2.0);
        assert_eq!(h.render.mixer().seeker(1).unwrap().position(), 0.0);
        assert_eq!(h.atomics.stats().stale_cycles, 0);
    }

    #[test]
    fn test_stale_snapshot_is_reused() {
        let config = MixerConfig::default();
        let mut h = harness(&config);

        h.control_tx.push(center_snapshot(4, config.volume.max_size)).unwrap();
        h.render.run_cycle();
        h.render.run_cycle();

        let stats = h.atomics.stats();
        assert_eq!(stats.stale_cycles, 1);
        assert_eq!(stats.cycles_rendered, 2);
        let frames = config.frames_per_period as f64;
        assert_eq!(h.render.mixer().seeker(4).unwrap().position(), 2.0 * frames);
    }

    #[test]
    fn test_recycled_buffers_are_reused() {
        let config = MixerConfig::default();
        let mut h = harness(&config);

        h.render.run_cycle();
        assert_eq!(h.atomics.stats().fresh_buffers, 1);

        let mut played = h.output_rx.pop().unwrap();
        played.as_mut_slice().fill(0.9);
        h.recycle_tx.push(played).unwrap();

        h.render.run_cycle();
        assert_eq!(h.atomics.stats().fresh_buffers, 1);
        let buffer = h.output_rx.pop().unwrap();
        assert!(buffer.as_slice().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_peak_recorded() {
        let config = MixerConfig::default();
        let mut h = harness(&config);
        let mut snapshot = center_snapshot(3, config.volume.max_size);
        snapshot[5] = TrackControl::active(Point::new(0.5, 0.5), config.volume.max_size);
        h.control_tx.push(snapshot).unwrap();
        h.render.run_cycle();

        let stats = h.atomics.stats();
        // Slots 3 and 5 sum to > 8.0 on every frame
        assert!(stats.peak > 8.0);
        assert_eq!(stats.clipped_periods, 1);
    }

    #[test]
    fn test_commands_applied_before_mixing() {
        let config = MixerConfig::default();
        let mut h = harness(&config);

        h.control_tx.push(center_snapshot(0, config.volume.max_size)).unwrap();
        h.render.run_cycle();
        h.output_rx.pop().unwrap();

        h.command_tx
            .push(MixerCommand::ReplaceTrack {
                slot: 0,
                store: Box::new(slot_store(6, config.sample_rate)),
            })
            .unwrap();
        h.render.run_cycle();
        let buffer = h.output_rx.pop().unwrap();
        assert_eq!(buffer.as_slice()[0], 6.0);

        h.command_tx.push(MixerCommand::ResetTrack { slot: 0 }).unwrap();
        h.command_tx.push(MixerCommand::ResetTrack { slot: 99 }).unwrap();
        h.render.process_commands();
        assert_eq!(h.render.mixer().seeker(0).unwrap().position(), 0.0);
    }

    #[test]
    fn test_mismatched_replacement_rejected() {
        let config = MixerConfig::default();
        let mut h = harness(&config);
        h.command_tx
            .push(MixerCommand::ReplaceTrack {
                slot: 2,
                store: Box::new(slot_store(6, 22050)),
            })
            .unwrap();
        h.render.process_commands();
        assert_eq!(h.render.mixer().seeker(2).unwrap().sample_rate(), 44100);
    }

    #[test]
    fn test_full_device_queue_blocks_without_loss() {
        let config = MixerConfig::default().with_queue_capacity(2);
        let h = harness(&config);
        let atomics = h.atomics.clone();
        let mut output_rx = h.output_rx;
        let mut render_thread = RenderThread::spawn(h.render).unwrap();

        // Two buffers fill the queue; the third cycle blocks on delivery
        assert!(wait_until(Duration::from_secs(5), || output_rx.slots() == 2));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(atomics.stats().cycles_rendered, 2);
        assert!(render_thread.is_running());

        // Draining one slot releases exactly one more delivery
        let first = output_rx.pop().unwrap();
        assert!(wait_until(Duration::from_secs(5), || atomics.stats().cycles_rendered == 3));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(atomics.stats().cycles_rendered, 3);
        assert_eq!(output_rx.slots(), 2);
        assert_eq!(first.len(), config.period_len());

        render_thread.join();
        assert!(!render_thread.is_running());
    }

    #[test]
    fn test_stop_while_blocked() {
        let config = MixerConfig::default().with_queue_capacity(1);
        let h = harness(&config);
        let atomics = h.atomics.clone();
        let mut render_thread = RenderThread::spawn(h.render).unwrap();

        assert!(wait_until(Duration::from_secs(5), || atomics.stats().cycles_rendered == 1));
        let started = Instant::now();
        render_thread.join();
        assert!(started.elapsed() < Duration::from_secs(1));
        drop(h.output_rx);
    }
}
