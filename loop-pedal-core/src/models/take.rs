use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::{FrameFormat, SampleFormat};

/// A take written to durable storage by a [`crate::traits::frame_codec::FrameCodec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTake {
    pub file_path: PathBuf,
    pub checksum: String,
    pub bytes_written: u64,
}

/// Produced when a recording is frozen and handed to playback.
#[derive(Debug, Clone, PartialEq)]
pub struct TakeSummary {
    pub id: String,
    pub frames: usize,
    pub duration_secs: f64,
    pub dropped_frames: u64,
    pub format: FrameFormat,
    pub persisted: Option<PersistedTake>,
}

impl TakeSummary {
    pub fn new(frames: usize, dropped_frames: u64, format: FrameFormat) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            frames,
            duration_secs: format.frames_to_secs(frames),
            dropped_frames,
            format,
            persisted: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }
}

/// Metadata stored alongside a persisted take.
///
/// Serializable for the JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeMetadata {
    pub id: String,
    pub created_at: String,
    pub file_path: String,
    pub checksum: String,
    pub frames: usize,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
}

impl TakeMetadata {
    pub fn for_take(summary: &TakeSummary, persisted: &PersistedTake) -> Self {
        Self {
            id: summary.id.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            file_path: persisted.file_path.to_string_lossy().into_owned(),
            checksum: persisted.checksum.clone(),
            frames: summary.frames,
            duration_secs: summary.duration_secs,
            sample_rate: summary.format.sample_rate,
            channels: summary.format.channels,
            sample_format: summary.format.sample_format,
        }
    }
}
