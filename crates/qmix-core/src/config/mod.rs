//! Configuration files and standard locations
//!
//! Every qmix config type derives `Serialize`/`Deserialize` with
//! `#[serde(default)]`, so a partial YAML file fills the rest from defaults.
//!
//! ```ignore
//! use qmix_core::config::{default_config_path, load_config, save_config};
//!
//! let path = default_config_path();
//! let config: PlayerConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod io;
mod paths;

pub use io::{load_config, read_config, save_config};
pub use paths::{default_config_dir, default_config_path, default_tracks_dir, CONFIG_FILE_NAME};
