//! Mixer - combines the seven track slots into one output period
//!
//! Each active slot is rendered at the speed its marker position maps to,
//! scaled by the gain its marker size maps to, and summed into the output.
//! Contributions are summed, not averaged: several loud tracks can exceed
//! full scale, and the render loop reports that as a diagnostic instead of
//! renormalizing.

use rayon::prelude::*;

use super::config::MixerConfig;
use super::error::{EngineError, EngineResult};
use super::mapping::{SpeedMapper, VolumeMapper};
use super::seeker::Seeker;
use crate::audio_file::SampleStore;
use crate::types::{ControlSnapshot, Sample, TrackControl, NUM_TRACKS};

/// One seeker per slot plus the control mappings
pub struct Mixer {
    seekers: [Seeker; NUM_TRACKS],
    /// Per-slot render targets, one period each
    scratch: [Vec<Sample>; NUM_TRACKS],
    speed: SpeedMapper,
    volume: VolumeMapper,
    frames_per_period: usize,
    channels: usize,
    sample_rate: u32,
    parallel: bool,
}

impl Mixer {
    /// Create a mixer over exactly one asset per slot
    ///
    /// Fails if the config is invalid or any asset's channel count or sample
    /// rate differs from the device configuration.
    pub fn new(config: &MixerConfig, stores: [SampleStore; NUM_TRACKS]) -> EngineResult<Self> {
        config.validate()?;
        for (slot, store) in stores.iter().enumerate() {
            check_store(config.channels, config.sample_rate, slot, store)?;
        }

        let half_width = config.kernel_half_width;
        let period_len = config.period_len();

        Ok(Self {
            seekers: stores.map(|store| Seeker::new(store, half_width)),
            scratch: std::array::from_fn(|_| vec![0.0; period_len]),
            speed: config.speed,
            volume: config.volume,
            frames_per_period: config.frames_per_period,
            channels: config.channels,
            sample_rate: config.sample_rate,
            parallel: config.parallel_render,
        })
    }

    /// Create a mixer from a list of assets, which must have one per slot
    pub fn from_stores(config: &MixerConfig, stores: Vec<SampleStore>) -> EngineResult<Self> {
        let found = stores.len();
        let stores: [SampleStore; NUM_TRACKS] =
            stores.try_into().map_err(|_| EngineError::TrackCount {
                expected: NUM_TRACKS,
                found,
            })?;
        Self::new(config, stores)
    }

    /// Interleaved samples per output period
    #[inline]
    pub fn period_len(&self) -> usize {
        self.frames_per_period * self.channels
    }

    #[inline]
    pub fn frames_per_period(&self) -> usize {
        self.frames_per_period
    }

    pub fn seeker(&self, slot: usize) -> Option<&Seeker> {
        self.seekers.get(slot)
    }

    /// Bind a new asset to `slot` and rewind it
    pub fn replace_track(&mut self, slot: usize, store: SampleStore) -> EngineResult<()> {
        if slot >= NUM_TRACKS {
            return Err(EngineError::UnknownSlot(slot));
        }
        check_store(self.channels, self.sample_rate, slot, &store)?;
        self.seekers[slot].replace_store(store);
        Ok(())
    }

    /// Rewind `slot`; returns false for an unknown slot
    pub fn reset_track(&mut self, slot: usize) -> bool {
        match self.seekers.get_mut(slot) {
            Some(seeker) => {
                seeker.reset();
                true
            }
            None => false,
        }
    }

    /// Render one period for `controls` into `output`
    ///
    /// `output` is overwritten. Inactive slots keep their cursor; active
    /// slots advance by one period at their mapped speed.
    pub fn mix(&mut self, controls: &ControlSnapshot, output: &mut [Sample]) {
        debug_assert_eq!(output.len(), self.period_len(), "output is not one period");
        output.fill(0.0);

        let frames = self.frames_per_period;
        let speed = self.speed;
        if self.parallel {
            self.seekers[..]
                .par_iter_mut()
                .zip(self.scratch[..].par_iter_mut())
                .zip(controls[..].par_iter())
                .for_each(|((seeker, scratch), control)| {
                    render_slot(seeker, scratch, control, &speed, frames)
                });
        } else {
            for ((seeker, scratch), control) in self
                .seekers
                .iter_mut()
                .zip(self.scratch.iter_mut())
                .zip(controls.iter())
            {
                render_slot(seeker, scratch, control, &speed, frames);
            }
        }

        // Accumulate serially in slot order so both paths sum identically
        for (scratch, control) in self.scratch.iter().zip(controls.iter()) {
            if !control.active {
                continue;
            }
            let gain = self.volume.volume(control.size) as Sample;
            for (out, &sample) in output.iter_mut().zip(scratch.iter()) {
                *out += sample * gain;
            }
        }
    }
}

/// Advance one slot by a period: render if active, hold the cursor if not
#[inline]
fn render_slot(
    seeker: &mut Seeker,
    scratch: &mut [Sample],
    control: &TrackControl,
    speed: &SpeedMapper,
    frames: usize,
) {
    if control.active {
        seeker.render_into(speed.speed(control.position.x), scratch);
    } else {
        seeker.noplay(frames);
    }
}

/// Reject assets that don't match the device format
pub(super) fn check_store(
    channels: usize,
    sample_rate: u32,
    slot: usize,
    store: &SampleStore,
) -> EngineResult<()> {
    if store.channel_count() != channels {
        return Err(EngineError::ChannelMismatch {
            slot,
            expected: channels,
            found: store.channel_count(),
        });
    }
    if store.sample_rate() != sample_rate {
        return Err(EngineError::SampleRateMismatch {
            slot,
            expected: sample_rate,
            found: store.sample_rate(),
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{silent_snapshot, Point};

    pub(crate) const TEST_FRAMES: usize = 1000;

    /// Stereo asset unique to `slot`: left = slot + f/1e4, right = -(left)
    pub(crate) fn slot_store(slot: usize, sample_rate: u32) -> SampleStore {
        let left: Vec<Sample> = (0..TEST_FRAMES)
            .map(|f| slot as Sample + f as Sample / 1e4)
            .collect();
        let right = left.iter().map(|s| -s).collect();
        SampleStore::from_channels(vec![left, right], sample_rate).unwrap()
    }

    pub(crate) fn test_stores(config: &MixerConfig) -> [SampleStore; NUM_TRACKS] {
        std::array::from_fn(|slot| slot_store(slot, config.sample_rate))
    }

    /// Expected interleaved frames of `slot` starting at integer `start`
    fn expected_frames(slot: usize, start: usize, frames: usize) -> Vec<Sample> {
        let store = slot_store(slot, 44100);
        (0..frames)
            .flat_map(|i| {
                let f = (start + i) % TEST_FRAMES;
                [store.channel(0)[f], store.channel(1)[f]]
            })
            .collect()
    }

    fn full_gain_center(config: &MixerConfig) -> TrackControl {
        TrackControl::active(Point::new(0.5, 0.5), config.volume.max_size)
    }

    #[test]
    fn test_single_track_native_speed_is_exact() {
        let config = MixerConfig::default();
        let mut mixer = Mixer::new(&config, test_stores(&config)).unwrap();
        let mut controls = silent_snapshot();
        controls[3] = full_gain_center(&config);

        let mut output = vec![0.0; config.period_len()];
        mixer.mix(&controls, &mut output);
        assert_eq!(output, expected_frames(3, 0, config.frames_per_period));

        // The next period continues where the last one stopped
        mixer.mix(&controls, &mut output);
        assert_eq!(
            output,
            expected_frames(3, config.frames_per_period, config.frames_per_period)
        );

        // Inactive slots never moved
        for slot in (0..NUM_TRACKS).filter(|&s| s != 3) {
            assert_eq!(mixer.seeker(slot).unwrap().position(), 0.0);
        }
    }

    #[test]
    fn test_silent_reverse_still_advances() {
        let config = MixerConfig::default();
        let frames = config.frames_per_period;
        let mut mixer = Mixer::new(&config, test_stores(&config)).unwrap();
        let mut controls = silent_snapshot();
        controls[3] = TrackControl::active(Point::new(0.0, 0.5), config.volume.min_size);

        let mut output = vec![1.0; config.period_len()];
        mixer.mix(&controls, &mut output);
        assert!(output.iter().all(|&s| s == 0.0));

        // Cursor moved at speed -3 even though nothing was audible
        let expected_start = TEST_FRAMES - 3 * frames;
        assert_eq!(mixer.seeker(3).unwrap().position(), expected_start as f64);

        // Reactivating at native speed and full gain plays from there
        controls[3] = full_gain_center(&config);
        mixer.mix(&controls, &mut output);
        assert_eq!(output, expected_frames(3, expected_start, frames));
    }

    #[test]
    fn test_deactivated_track_resumes() {
        let config = MixerConfig::default();
        let frames = config.frames_per_period;
        let mut mixer = Mixer::new(&config, test_stores(&config)).unwrap();
        let mut output = vec![0.0; config.period_len()];

        let mut controls = silent_snapshot();
        controls[1] = full_gain_center(&config);
        mixer.mix(&controls, &mut output);

        controls[1] = TrackControl::inactive();
        for _ in 0..3 {
            mixer.mix(&controls, &mut output);
            assert!(output.iter().all(|&s| s == 0.0));
        }

        controls[1] = full_gain_center(&config);
        mixer.mix(&controls, &mut output);
        assert_eq!(output, expected_frames(1, frames, frames));
    }

    #[test]
    fn test_contributions_are_summed() {
        let config = MixerConfig::default();
        let mut mixer = Mixer::new(&config, test_stores(&config)).unwrap();
        let mut controls = silent_snapshot();
        controls[2] = full_gain_center(&config);
        controls[5] = full_gain_center(&config);

        let mut output = vec![0.0; config.period_len()];
        mixer.mix(&controls, &mut output);

        let a = expected_frames(2, 0, config.frames_per_period);
        let b = expected_frames(5, 0, config.frames_per_period);
        for ((out, a), b) in output.iter().zip(&a).zip(&b) {
            assert!((out - (a + b)).abs() < 1e-5);
        }
        // Not normalized: left channel of frame 0 is 2 + 5
        assert!((output[0] - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_gain_scales_contribution() {
        let config = MixerConfig::default();
        let mut mixer = Mixer::new(&config, test_stores(&config)).unwrap();
        let mut controls = silent_snapshot();
        let half = (config.volume.min_size + config.volume.max_size) / 2.0;
        controls[4] = TrackControl::active(Point::new(0.6, 0.1), half);

        let mut output = vec![0.0; config.period_len()];
        mixer.mix(&controls, &mut output);
        let full = expected_frames(4, 0, config.frames_per_period);
        for (out, full) in output.iter().zip(&full) {
            assert!((out - full * 0.5).abs() < 1e-4);
        }
    }

    #[test]
    fn test_non_finite_control_does_not_poison_mix() {
        let config = MixerConfig::default();
        let mut mixer = Mixer::new(&config, test_stores(&config)).unwrap();
        let mut controls = silent_snapshot();
        controls[3] = full_gain_center(&config);
        controls[4] = TrackControl::active(Point::new(f64::NAN, 0.5), f64::NAN);

        let mut output = vec![0.0; config.period_len()];
        mixer.mix(&controls, &mut output);
        assert!(output.iter().all(|s| s.is_finite()));
        assert_eq!(output, expected_frames(3, 0, config.frames_per_period));

        // An infinite area is silent as well
        controls[4] = TrackControl::active(Point::new(0.5, 0.5), f64::INFINITY);
        mixer.mix(&controls, &mut output);
        assert_eq!(
            output,
            expected_frames(3, config.frames_per_period, config.frames_per_period)
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential_config = MixerConfig::default();
        let parallel_config = MixerConfig::default().with_parallel_render(true);
        let mut sequential = Mixer::new(&sequential_config, test_stores(&sequential_config)).unwrap();
        let mut parallel = Mixer::new(&parallel_config, test_stores(&parallel_config)).unwrap();

        let mut controls = silent_snapshot();
        for (slot, control) in controls.iter_mut().enumerate() {
            let x = slot as f64 / NUM_TRACKS as f64;
            *control = TrackControl::active(Point::new(x, 0.5), 0.0003);
        }

        let mut a = vec![0.0; sequential_config.period_len()];
        let mut b = vec![0.0; parallel_config.period_len()];
        for _ in 0..4 {
            sequential.mix(&controls, &mut a);
            parallel.mix(&controls, &mut b);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_channel_mismatch_is_fatal() {
        let config = MixerConfig::default();
        let mut stores = test_stores(&config);
        stores[6] = SampleStore::from_channels(vec![vec![0.0; 10]], config.sample_rate).unwrap();
        assert!(matches!(
            Mixer::new(&config, stores),
            Err(EngineError::ChannelMismatch { slot: 6, expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_sample_rate_mismatch_is_fatal() {
        let config = MixerConfig::default();
        let mut stores = test_stores(&config);
        stores[0] = slot_store(0, 48000);
        assert!(matches!(
            Mixer::new(&config, stores),
            Err(EngineError::SampleRateMismatch { slot: 0, expected: 44100, found: 48000 })
        ));
    }

    #[test]
    fn test_from_stores_requires_every_slot() {
        let config = MixerConfig::default();
        let stores: Vec<SampleStore> = (0..5).map(|slot| slot_store(slot, 44100)).collect();
        assert!(matches!(
            Mixer::from_stores(&config, stores),
            Err(EngineError::TrackCount { expected: 7, found: 5 })
        ));
    }

    #[test]
    fn test_replace_and_reset_track() {
        let config = MixerConfig::default();
        let mut mixer = Mixer::new(&config, test_stores(&config)).unwrap();
        let mut controls = silent_snapshot();
        controls[0] = full_gain_center(&config);
        let mut output = vec![0.0; config.period_len()];
        mixer.mix(&controls, &mut output);
        assert!(mixer.seeker(0).unwrap().position() > 0.0);

        assert!(mixer.reset_track(0));
        assert_eq!(mixer.seeker(0).unwrap().position(), 0.0);
        assert!(!mixer.reset_track(NUM_TRACKS));

        mixer.mix(&controls, &mut output);
        mixer.replace_track(0, slot_store(6, 44100)).unwrap();
        assert_eq!(mixer.seeker(0).unwrap().position(), 0.0);
        mixer.mix(&controls, &mut output);
        assert_eq!(output, expected_frames(6, 0, config.frames_per_period));

        let mono = SampleStore::from_channels(vec![vec![0.0; 10]], 44100).unwrap();
        assert!(mixer.replace_track(0, mono).is_err());
        assert!(matches!(
            mixer.replace_track(NUM_TRACKS, slot_store(1, 44100)),
            Err(EngineError::UnknownSlot(7))
        ));
    }
}
