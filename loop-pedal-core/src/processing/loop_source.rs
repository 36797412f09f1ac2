use crate::models::audio_models::FrameFormat;
use crate::processing::frame_store::FrameStore;

/// Endless, seamless playback over a finished take.
///
/// A read cursor over an immutable [`FrameStore`]. When the cursor reaches the end it wraps
/// to frame 0 within the same read, so every call fills its whole output and no gap is
/// inserted at the loop boundary. An empty store plays silence.
#[derive(Debug, Clone)]
pub struct LoopSource {
    store: FrameStore,
    position: usize,
}

impl LoopSource {
    pub fn new(store: FrameStore) -> Self {
        Self { store, position: 0 }
    }

    /// Fill `output` with interleaved frames, wrapping as often as needed.
    ///
    /// Returns the number of frames written, always `output.len() / channels`. A trailing
    /// partial frame in `output` is zeroed.
    pub fn read(&mut self, output: &mut [f32]) -> usize {
        let per_frame = self.store.format().samples_per_frame();
        let frame_count = output.len() / per_frame;
        let total = self.store.frames();

        if total == 0 {
            output.fill(0.0);
            return frame_count;
        }

        let samples = self.store.samples();
        let mut written = 0;
        while written < frame_count {
            let run = (frame_count - written).min(total - self.position);
            let dst = &mut output[written * per_frame..(written + run) * per_frame];
            dst.copy_from_slice(&samples[self.position * per_frame..(self.position + run) * per_frame]);
            written += run;
            self.position += run;
            if self.position == total {
                self.position = 0;
            }
        }

        output[frame_count * per_frame..].fill(0.0);
        frame_count
    }

    /// Cursor position in frames, in `[0, total_frames)` (0 for an empty take).
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total_frames(&self) -> usize {
        self.store.frames()
    }

    pub fn format(&self) -> FrameFormat {
        self.store.format()
    }

    /// Restart playback from the first frame.
    pub fn rewind(&mut self) {
        self.position = 0;
    }
}
