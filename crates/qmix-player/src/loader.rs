//! Track asset loading for qmix-player
//!
//! All seven slots are decoded in parallel at startup. Any failure is fatal:
//! the engine never starts with a missing or mismatched slot.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use qmix_core::audio_file::SampleStore;
use qmix_core::engine::{EngineError, EngineResult, MixerConfig};
use qmix_core::NUM_TRACKS;

/// Decode one asset for `slot` and check it against the engine format
pub fn load_track(slot: usize, path: &Path, config: &MixerConfig) -> EngineResult<SampleStore> {
    let store = SampleStore::load(path).map_err(|source| EngineError::Asset { slot, source })?;
    config.check_store(slot, &store)?;
    Ok(store)
}

/// Decode every slot's asset, in parallel
///
/// Returns the error of the lowest failing slot.
pub fn load_tracks(
    paths: &[PathBuf; NUM_TRACKS],
    config: &MixerConfig,
) -> EngineResult<[SampleStore; NUM_TRACKS]> {
    let results: Vec<EngineResult<SampleStore>> = paths
        .par_iter()
        .enumerate()
        .map(|(slot, path)| load_track(slot, path, config))
        .collect();
    let stores = results.into_iter().collect::<EngineResult<Vec<_>>>()?;

    let found = stores.len();
    stores.try_into().map_err(|_| EngineError::TrackCount {
        expected: NUM_TRACKS,
        found,
    })
}
