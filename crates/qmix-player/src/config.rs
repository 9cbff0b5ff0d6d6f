//! Player configuration for qmix-player
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: `<config_dir>/qmix/config.yaml`

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use qmix_core::audio::AudioConfig;
use qmix_core::config::default_tracks_dir;
use qmix_core::engine::MixerConfig;
use qmix_core::NUM_TRACKS;

/// Default interval between diagnostics log lines
pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 2000;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output device
    pub audio: AudioConfig,
    /// Engine format and control mappings
    pub mixer: MixerConfig,
    /// Where the seven track assets come from
    pub tracks: TracksConfig,
    /// How often engine diagnostics are logged
    pub monitor_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            mixer: MixerConfig::default(),
            tracks: TracksConfig::default(),
            monitor_interval_ms: DEFAULT_MONITOR_INTERVAL_MS,
        }
    }
}

/// Track asset locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracksConfig {
    /// Directory holding `0.wav` .. `6.wav`, and the base for relative paths
    pub directory: PathBuf,
    /// Explicit per-slot files, overriding the numbered layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<PathBuf>>,
}

impl Default for TracksConfig {
    fn default() -> Self {
        Self {
            directory: default_tracks_dir(),
            files: None,
        }
    }
}

impl TracksConfig {
    /// Resolve a path against [`TracksConfig::directory`] unless absolute
    pub fn resolve(&self, path: impl Into<PathBuf>) -> PathBuf {
        let path = path.into();
        if path.is_absolute() {
            path
        } else {
            self.directory.join(path)
        }
    }

    /// The asset path for every slot
    pub fn paths(&self) -> Result<[PathBuf; NUM_TRACKS]> {
        match &self.files {
            Some(files) if files.len() != NUM_TRACKS => {
                bail!(
                    "tracks.files lists {} files, need exactly {}",
                    files.len(),
                    NUM_TRACKS
                )
            }
            Some(files) => Ok(std::array::from_fn(|slot| self.resolve(&files[slot]))),
            None => Ok(std::array::from_fn(|slot| {
                self.directory.join(format!("{}.wav", slot))
            })),
        }
    }
}
