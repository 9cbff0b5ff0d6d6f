//! Audio backend error types

use thiserror::Error;

use crate::engine::EngineError;

/// Errors that can occur while opening or running the output stream
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio devices available
    #[error("No audio output devices found")]
    NoDevices,

    /// Failed to get default device
    #[error("Failed to get default audio device: {0}")]
    NoDefaultDevice(String),

    /// Device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// The device cannot run the engine's stream format
    #[error("Unsupported stream config: {0}")]
    ConfigError(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/play stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// The device asked for periods of a size the engine does not render
    #[error("Device period size differs from the configured {expected} samples")]
    PeriodMismatch { expected: usize },

    /// The render thread is no longer running
    #[error("Render thread exited while the stream was running")]
    RenderStopped,

    /// Engine construction failed
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
