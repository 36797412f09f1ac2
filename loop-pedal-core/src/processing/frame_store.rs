use std::sync::Arc;

use crate::models::audio_models::FrameFormat;

/// Immutable store of interleaved `f32` frames.
///
/// Produced by freezing a [`super::capture_buffer::CaptureBuffer`] or by decoding a
/// persisted take. Cloning shares the samples.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStore {
    samples: Arc<[f32]>,
    format: FrameFormat,
}

impl FrameStore {
    /// Build a store from interleaved samples. A trailing partial frame is discarded.
    pub fn from_samples(format: FrameFormat, mut samples: Vec<f32>) -> Self {
        let per_frame = format.samples_per_frame();
        samples.truncate(samples.len() - samples.len() % per_frame);
        Self {
            samples: samples.into(),
            format,
        }
    }

    pub fn empty(format: FrameFormat) -> Self {
        Self::from_samples(format, Vec::new())
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    /// Interleaved samples, `frames() * channels` long.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Samples of a single frame, or `None` past the end of the store.
    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let per_frame = self.format.samples_per_frame();
        let start = index.checked_mul(per_frame)?;
        self.samples.get(start..start.checked_add(per_frame)?)
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.samples_per_frame()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.format.frames_to_secs(self.frames())
    }
}
