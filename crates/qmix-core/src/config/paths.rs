//! Standard locations for qmix files

use std::path::PathBuf;

/// File name of the player config inside [`default_config_dir`]
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Per-user config directory: `<config_dir>/qmix`
///
/// Falls back to `./qmix` when the platform has no config directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qmix")
}

/// `<config_dir>/qmix/config.yaml`
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILE_NAME)
}

/// Where track assets are looked up by default: `<data_dir>/qmix/tracks`
pub fn default_tracks_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qmix")
        .join("tracks")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_layout() {
        let path = default_config_path();
        assert!(path.ends_with("qmix/config.yaml"));
        assert!(path.starts_with(default_config_dir()));
    }

    #[test]
    fn test_tracks_dir_layout() {
        assert!(default_tracks_dir().ends_with("qmix/tracks"));
    }
}
