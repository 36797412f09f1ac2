use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::audio_models::{CaptureDiagnostics, FrameFormat};
use crate::processing::frame_store::FrameStore;
use crate::processing::segment_pool::{Segment, SegmentSupply};

/// Counters shared between the audio callback and the control thread.
///
/// Only relaxed atomics; the callback never blocks on them.
#[derive(Debug, Default)]
pub struct CaptureStats {
    capture_callbacks: AtomicU64,
    playback_callbacks: AtomicU64,
    frames_captured: AtomicU64,
    frames_dropped: AtomicU64,
    frames_rendered: AtomicU64,
    contended_callbacks: AtomicU64,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_capture_callback(&self) {
        self.capture_callbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_playback_callback(&self, frames: usize) {
        self.playback_callbacks.fetch_add(1, Ordering::Relaxed);
        self.frames_rendered.fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub fn record_captured(&self, frames: usize) {
        self.frames_captured.fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, frames: usize) {
        self.frames_dropped.fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub fn record_contended(&self) {
        self.contended_callbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    /// Zero the per-take capture counters.
    pub fn reset_capture(&self) {
        self.frames_captured.store(0, Ordering::Relaxed);
        self.frames_dropped.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CaptureDiagnostics {
        CaptureDiagnostics {
            capture_callbacks: self.capture_callbacks.load(Ordering::Relaxed),
            playback_callbacks: self.playback_callbacks.load(Ordering::Relaxed),
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            contended_callbacks: self.contended_callbacks.load(Ordering::Relaxed),
        }
    }
}

/// Append-only store of captured frames, written by the capture callback.
///
/// Storage is a list of fixed-size [`Segment`]s supplied from a pre-allocated pool, and
/// the segment index itself is sized up front, so `append` never allocates.
///
/// Overflow behavior: a chunk that does not fit is dropped whole and counted; frames
/// already stored are never touched.
pub struct CaptureBuffer {
    format: FrameFormat,
    segments: Vec<Segment>,
    max_segments: usize,
    supply: SegmentSupply,
    frames: usize,
    stats: Arc<CaptureStats>,
}

impl CaptureBuffer {
    /// Must be called off the audio thread: allocates the segment index.
    pub fn new(format: FrameFormat, supply: SegmentSupply, max_segments: usize, stats: Arc<CaptureStats>) -> Self {
        Self {
            format,
            segments: Vec::with_capacity(max_segments),
            max_segments,
            supply,
            frames: 0,
            stats,
        }
    }

    /// Append interleaved frames. Returns false if the chunk was dropped.
    ///
    /// A trailing partial frame is ignored.
    pub fn append(&mut self, samples: &[f32]) -> bool {
        let per_frame = self.format.samples_per_frame();
        let frame_count = samples.len() / per_frame;
        if frame_count == 0 {
            return true;
        }
        let samples = &samples[..frame_count * per_frame];

        if !self.has_room_for(samples.len()) {
            self.stats.record_dropped(frame_count);
            return false;
        }

        let mut rest = samples;
        while !rest.is_empty() {
            if self.segments.last().map_or(true, Segment::is_full) {
                let Some(segment) = self.supply.take() else {
                    break;
                };
                self.segments.push(segment);
            }
            if let Some(current) = self.segments.last_mut() {
                let written = current.push(rest);
                rest = &rest[written..];
            }
        }

        self.frames += frame_count;
        self.stats.record_captured(frame_count);
        true
    }

    fn has_room_for(&self, sample_count: usize) -> bool {
        let current_room = self.segments.last().map_or(0, Segment::room);
        if sample_count <= current_room {
            return true;
        }
        let segment_samples = self.supply.segment_samples().max(1);
        let needed = (sample_count - current_room).div_ceil(segment_samples);
        needed <= self.supply.available() && self.segments.len() + needed <= self.max_segments
    }

    /// Frames stored so far.
    pub fn len(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// End the recording and flatten the segments into one immutable store.
    ///
    /// Runs on the control thread after the capture path has been quiesced.
    pub fn freeze(self) -> FrameStore {
        let mut samples = Vec::with_capacity(self.frames * self.format.samples_per_frame());
        for segment in &self.segments {
            samples.extend_from_slice(segment.samples());
        }
        FrameStore::from_samples(self.format, samples)
    }
}
