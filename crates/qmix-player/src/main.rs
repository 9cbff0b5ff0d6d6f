//! qmix Player - seven tracks mixed by tracked marker positions
//!
//! This is the main entry point. It:
//! 1. Loads the config and decodes the seven track assets
//! 2. Starts the render thread and the output stream
//! 3. Reads tracker messages from stdin until it closes
//! 4. Logs engine diagnostics while playing
//!
//! ## Command line flags
//!
//! - `--config <path>`: Config file (default `<config_dir>/qmix/config.yaml`)
//! - `--tracks <dir>`: Directory holding `0.wav` .. `6.wav`
//! - `--list-devices`: Print available output devices and exit

mod config;
mod control;
mod loader;
mod monitor;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use qmix_core::audio::{list_output_devices, start_audio_system, AudioSystemResult};
use qmix_core::config::{default_config_path, load_config, read_config};
use qmix_core::engine::Mixer;
use qmix_core::NUM_TRACKS;

use config::PlayerConfig;
use control::ControlBridge;
use monitor::Monitor;

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct Args {
    config_path: Option<PathBuf>,
    tracks_dir: Option<PathBuf>,
    list_devices: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                parsed.config_path = Some(PathBuf::from(path));
            }
            "--tracks" => {
                let dir = args.next().context("--tracks needs a directory")?;
                parsed.tracks_dir = Some(PathBuf::from(dir));
            }
            "--list-devices" => parsed.list_devices = true,
            other => bail!(
                "unknown argument {:?} (usage: qmix-player [--config <path>] [--tracks <dir>] [--list-devices])",
                other
            ),
        }
    }
    Ok(parsed)
}

/// Load the config; an explicitly named file must exist and parse
fn load_player_config(args: &Args) -> Result<PlayerConfig> {
    let mut config: PlayerConfig = match &args.config_path {
        Some(path) => read_config(path)?,
        None => load_config(&default_config_path()),
    };
    if let Some(dir) = &args.tracks_dir {
        config.tracks.directory = dir.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args(std::env::args().skip(1))?;

    if args.list_devices {
        for device in list_output_devices()? {
            println!("{}", device);
        }
        return Ok(());
    }

    log::info!("qmix-player starting up");
    let config = load_player_config(&args)?;
    config.mixer.validate()?;

    if config.mixer.parallel_render {
        // Build the pool before audio starts so the first render cycle
        // doesn't pay for lazy initialization
        rayon::ThreadPoolBuilder::new()
            .num_threads(NUM_TRACKS)
            .thread_name(|i| format!("rayon-render-{}", i))
            .build_global()
            .context("Failed to initialize Rayon thread pool")?;
        log::info!("Rayon thread pool initialized with {} threads", NUM_TRACKS);
    }

    let paths = config.tracks.paths()?;
    let stores = loader::load_tracks(&paths, &config.mixer)?;
    let mixer = Mixer::new(&config.mixer, stores)?;

    let AudioSystemResult {
        mut handle,
        control_sender,
        command_sender,
        atomics,
        latency_ms,
        ..
    } = start_audio_system(&config.audio, &config.mixer, mixer)?;
    log::info!(
        "Playing on {} (~{:.1}ms control latency)",
        handle.device_name(),
        latency_ms
    );

    let bridge = ControlBridge::new(
        control_sender,
        command_sender,
        config.tracks.clone(),
        config.mixer.clone(),
    );
    let bridge_thread = thread::Builder::new()
        .name("qmix-control".to_string())
        .spawn(move || bridge.run(std::io::stdin().lock()))
        .context("Failed to spawn control bridge thread")?;

    let mut monitor = Monitor::new(atomics);
    let interval = Duration::from_millis(config.monitor_interval_ms.max(10));
    let result = loop {
        if bridge_thread.is_finished() {
            break Ok(());
        }
        thread::sleep(interval);
        monitor.tick();
        if let Err(e) = handle.check_health() {
            break Err(e);
        }
    };

    handle.shutdown();
    result.context("Playback stopped")?;

    // The bridge has seen EOF, so this returns immediately
    if bridge_thread.join().is_err() {
        log::error!("Control bridge panicked");
    }
    log::info!("qmix-player stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(args(&[]).unwrap(), Args::default());

        let parsed = args(&["--tracks", "/srv/set", "--config", "qmix.yaml"]).unwrap();
        assert_eq!(parsed.tracks_dir, Some(PathBuf::from("/srv/set")));
        assert_eq!(parsed.config_path, Some(PathBuf::from("qmix.yaml")));
        assert!(!parsed.list_devices);

        assert!(args(&["--list-devices"]).unwrap().list_devices);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(args(&["--config"]).is_err());
        assert!(args(&["--verbose"]).is_err());
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let missing = Args {
            config_path: Some(PathBuf::from("/nonexistent/qmix.yaml")),
            ..Default::default()
        };
        assert!(load_player_config(&missing).is_err());
    }

    #[test]
    fn test_tracks_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "tracks:\n  directory: /from/config\nmonitor_interval_ms: 500\n").unwrap();

        let parsed = Args {
            config_path: Some(path),
            tracks_dir: Some(PathBuf::from("/from/flag")),
            list_devices: false,
        };
        let config = load_player_config(&parsed).unwrap();
        assert_eq!(config.tracks.directory, PathBuf::from("/from/flag"));
        assert_eq!(config.monitor_interval_ms, 500);
    }
}
