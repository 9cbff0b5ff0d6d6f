//! Mixing engine - seekers, control mapping, render thread
//!
//! This module contains everything between the tracker and the device:
//! - Seeker: Lanczos-interpolated, wrap-around playback cursor per track
//! - SpeedMapper / VolumeMapper: marker position and size to speed and gain
//! - Mixer: sums the seven track slots into one period
//! - RenderLoop: the render thread, with queue backpressure toward the device

mod command;
mod config;
mod engine;
mod error;
mod gc;
mod mapping;
mod mixer;
mod render;
mod seeker;
mod stats;

pub use command::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use gc::gc_handle;
pub use mapping::*;
pub use mixer::*;
pub use render::*;
pub use seeker::*;
pub use stats::*;
