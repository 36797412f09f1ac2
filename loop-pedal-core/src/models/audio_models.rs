use std::fmt;

use serde::{Deserialize, Serialize};

/// On-the-wire sample encoding negotiated with a device or written to disk.
///
/// Frames are always held as interleaved `f32` in memory; this only decides
/// how they are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    #[default]
    F32,
    I16,
}

impl SampleFormat {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::F32 => 4,
            Self::I16 => 2,
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        (self.bytes_per_sample() * 8) as u16
    }
}

/// Frame layout fixed for the lifetime of one recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameFormat {
    pub sample_format: SampleFormat,
    pub channels: u16,
    pub sample_rate: u32,
}

impl FrameFormat {
    pub fn new(sample_format: SampleFormat, channels: u16, sample_rate: u32) -> Self {
        Self {
            sample_format,
            channels,
            sample_rate,
        }
    }

    /// Samples per frame (one per channel).
    pub fn samples_per_frame(&self) -> usize {
        self.channels.max(1) as usize
    }

    /// Bytes per frame in the persisted encoding.
    pub fn bytes_per_frame(&self) -> usize {
        self.samples_per_frame() * self.sample_format.bytes_per_sample()
    }

    pub fn frames_to_secs(&self, frames: usize) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        frames as f64 / self.sample_rate as f64
    }

    pub fn secs_to_frames(&self, secs: f64) -> usize {
        (secs.max(0.0) * self.sample_rate as f64).ceil() as usize
    }
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self::new(SampleFormat::F32, 2, 44100)
    }
}

/// Direction an audio port is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Capture,
    Playback,
    Duplex,
}

impl PortDirection {
    pub fn captures(&self) -> bool {
        matches!(self, Self::Capture | Self::Duplex)
    }

    pub fn plays(&self) -> bool {
        matches!(self, Self::Playback | Self::Duplex)
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Capture => "capture",
            Self::Playback => "playback",
            Self::Duplex => "duplex",
        })
    }
}

/// An audio device backing a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub name: String,
    pub direction: PortDirection,
    pub is_default: bool,
}

/// Counters for debugging a session. Snapshot of [`crate::processing::capture_buffer::CaptureStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureDiagnostics {
    pub capture_callbacks: u64,
    pub playback_callbacks: u64,
    pub frames_captured: u64,
    pub frames_dropped: u64,
    pub frames_rendered: u64,
    pub contended_callbacks: u64,
}
