use std::path::PathBuf;

use serde::Deserialize;

use super::audio_models::{FrameFormat, SampleFormat};
use crate::processing::wav_format;

/// How capture and playback map onto audio devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortWiring {
    /// One device performs capture and playback; it runs for the whole session.
    #[default]
    Duplex,
    /// Separate capture and playback devices, started and stopped per state.
    Split,
}

/// Where a finished take lives before it is looped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Persistence {
    #[default]
    InMemory,
    /// Encode each take to a WAV file and loop the decoded file.
    File { path: PathBuf },
}

/// Configuration for a loop pedal session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PedalConfiguration {
    /// Sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// Number of interleaved channels (default: 2).
    pub channels: u16,

    /// Persisted sample encoding (default: f32).
    pub sample_format: SampleFormat,

    pub wiring: PortWiring,

    pub persistence: Persistence,

    /// Frames per capture segment (default: 4096).
    pub segment_frames: usize,

    /// Spare segments allocated before recording starts (default: 32).
    pub prealloc_segments: usize,

    /// Longest take in seconds; later chunks are dropped (default: 600).
    pub max_take_secs: f64,

    /// Trigger poll cadence in milliseconds (default: 5).
    pub poll_interval_ms: u64,

    /// Capture device name pattern, or None for the host default.
    pub capture_device: Option<String>,

    /// Playback device name pattern, or None for the host default.
    pub playback_device: Option<String>,
}

impl PedalConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if !(1..=8).contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.segment_frames == 0 {
            return Err("segment size must be at least one frame".into());
        }
        if self.prealloc_segments == 0 {
            return Err("at least one segment must be preallocated".into());
        }
        if self.max_take_secs.is_nan() || self.max_take_secs <= 0.0 {
            return Err(format!("invalid maximum take length: {}", self.max_take_secs));
        }
        if let Persistence::File { path } = &self.persistence {
            if path.as_os_str().is_empty() {
                return Err("persistence path is empty".into());
            }
            let max_bytes = self.max_take_bytes();
            if max_bytes > wav_format::MAX_DATA_SIZE {
                return Err(format!(
                    "a {}s take needs {} bytes, more than a WAV file can hold",
                    self.max_take_secs, max_bytes
                ));
            }
        }
        Ok(())
    }

    pub fn frame_format(&self) -> FrameFormat {
        FrameFormat::new(self.sample_format, self.channels, self.sample_rate)
    }

    /// Encoded size of the longest take.
    pub fn max_take_bytes(&self) -> u64 {
        let format = self.frame_format();
        format.secs_to_frames(self.max_take_secs) as u64 * format.bytes_per_frame() as u64
    }

    /// Upper bound on the number of segments one take may use.
    pub fn max_segments(&self) -> usize {
        let max_frames = self.frame_format().secs_to_frames(self.max_take_secs);
        max_frames.div_ceil(self.segment_frames.max(1)).max(1)
    }
}

impl Default for PedalConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            sample_format: SampleFormat::F32,
            wiring: PortWiring::Duplex,
            persistence: Persistence::InMemory,
            segment_frames: 4096,
            prealloc_segments: 32,
            max_take_secs: 600.0,
            poll_interval_ms: 5,
            capture_device: None,
            playback_device: None,
        }
    }
}
