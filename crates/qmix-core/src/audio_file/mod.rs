//! Track asset loading
//!
//! A [`SampleStore`] holds one audio file fully decoded into memory as
//! per-channel `f32` arrays. Decoding goes through symphonia, so any format
//! it probes (WAV, FLAC, OGG/Vorbis) is accepted. Stores are immutable after
//! construction.

use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

use crate::types::Sample;

/// Errors that can occur while loading a track asset
#[derive(Error, Debug)]
pub enum AudioFileError {
    #[error("Failed to open {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Decode error: {0}")]
    Decode(String),

    /// No frames or no channels; a looping cursor needs at least one frame
    #[error("Audio asset contains no samples")]
    Empty,

    #[error("Channel {channel} has {len} frames, expected {expected}")]
    RaggedChannels {
        channel: usize,
        len: usize,
        expected: usize,
    },
}

/// One track's decoded audio, de-interleaved
#[derive(Debug, Clone)]
pub struct SampleStore {
    channels: Vec<Vec<Sample>>,
    sample_rate: u32,
    frame_count: usize,
}

impl SampleStore {
    /// Build a store from already de-interleaved channel data
    pub fn from_channels(
        channels: Vec<Vec<Sample>>,
        sample_rate: u32,
    ) -> Result<Self, AudioFileError> {
        let frame_count = channels.first().map(Vec::len).unwrap_or(0);
        if frame_count == 0 {
            return Err(AudioFileError::Empty);
        }
        if let Some((channel, data)) = channels
            .iter()
            .enumerate()
            .find(|(_, data)| data.len() != frame_count)
        {
            return Err(AudioFileError::RaggedChannels {
                channel,
                len: data.len(),
                expected: frame_count,
            });
        }

        Ok(Self {
            channels,
            sample_rate,
            frame_count,
        })
    }

    /// Build a store from interleaved samples `[c0, c1, .., c0, c1, ..]`
    ///
    /// A trailing partial frame is ignored.
    pub fn from_interleaved(
        interleaved: &[Sample],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self, AudioFileError> {
        if channel_count == 0 {
            return Err(AudioFileError::Empty);
        }
        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::from_channels(channels, sample_rate)
    }

    /// Decode an audio file completely into memory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AudioFileError> {
        let path = path.as_ref();
        let (interleaved, sample_rate, channel_count) = decode_interleaved(path)?;
        let store = Self::from_interleaved(&interleaved, channel_count, sample_rate)?;

        log::info!(
            "Loaded {:?}: {} channels, {}Hz, {} frames ({:.1}s)",
            path,
            store.channel_count(),
            store.sample_rate,
            store.frame_count,
            store.duration_seconds()
        );
        Ok(store)
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Samples of one channel
    #[inline]
    pub fn channel(&self, index: usize) -> &[Sample] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<Sample>] {
        &self.channels
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frame_count as f64 / self.sample_rate as f64
    }
}

/// Decode every packet of the first audio track into interleaved f32
fn decode_interleaved(path: &Path) -> Result<(Vec<Sample>, u32, usize), AudioFileError> {
    let file = File::open(path).map_err(|source| AudioFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioFileError::UnsupportedFormat(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioFileError::UnsupportedFormat("No audio track found".to_string()))?;
    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioFileError::UnsupportedFormat("Unknown sample rate".to_string()))?;
    let mut channel_count = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioFileError::UnsupportedFormat(e.to_string()))?;

    let mut samples: Vec<Sample> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<Sample>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioFileError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping corrupt packet in {:?}: {}", path, e);
                continue;
            }
            Err(e) => return Err(AudioFileError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        channel_count = spec.channels.count();
        let needed = decoded.capacity() * channel_count;
        if sample_buf.as_ref().map_or(true, |buf| buf.capacity() < needed) {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    Ok((samples, sample_rate, channel_count))
}
