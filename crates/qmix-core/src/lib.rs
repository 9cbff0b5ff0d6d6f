//! qmix Core - seven-track spatial mixer driven by tracked marker positions

pub mod audio;
pub mod config;
pub mod types;
pub mod audio_file;
pub mod engine;

pub use types::*;
