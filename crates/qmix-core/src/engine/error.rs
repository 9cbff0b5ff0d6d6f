//! Engine error types

use thiserror::Error;

use crate::audio_file::AudioFileError;

/// Fatal engine errors, all raised before any audio thread starts
#[derive(Error, Debug)]
pub enum EngineError {
    /// A tunable is out of its valid range
    #[error("Invalid mixer configuration: {0}")]
    InvalidConfig(String),

    /// An asset's channel count differs from the device configuration
    #[error("Track {slot}: asset has {found} channels, device expects {expected}")]
    ChannelMismatch {
        slot: usize,
        expected: usize,
        found: usize,
    },

    /// An asset's sample rate differs from the device configuration
    #[error("Track {slot}: asset is {found}Hz, device expects {expected}Hz")]
    SampleRateMismatch {
        slot: usize,
        expected: u32,
        found: u32,
    },

    /// Wrong number of track assets
    #[error("Expected {expected} track assets, got {found}")]
    TrackCount { expected: usize, found: usize },

    /// Slot index outside the fixed slot array
    #[error("No track slot {0}")]
    UnknownSlot(usize),

    /// A track asset could not be loaded
    #[error("Track {slot}: {source}")]
    Asset {
        slot: usize,
        #[source]
        source: AudioFileError,
    },

    /// The render thread could not be spawned
    #[error("Failed to spawn render thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
