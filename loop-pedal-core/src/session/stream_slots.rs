use std::sync::Arc;

use parking_lot::Mutex;

use crate::processing::capture_buffer::{CaptureBuffer, CaptureStats};
use crate::processing::loop_source::LoopSource;
use crate::traits::audio_port::PortCallback;

/// Handoff point between the controller and the real-time callback.
///
/// The controller owns what sits in the slots; the callback only borrows it for the duration
/// of one invocation. The callback uses `try_lock` and never waits: if the controller holds a
/// slot mid-transition, the callback skips that chunk (capture) or plays silence (playback).
/// Conversely, `take_*` waits for at most one in-flight invocation, which makes it a
/// quiescence point even when the device keeps running (duplex wiring).
///
/// Capture and playback use separate slots so a duplex device's input and output callbacks
/// never contend with each other.
pub struct StreamSlots {
    capture: Mutex<Option<CaptureBuffer>>,
    playback: Mutex<Option<LoopSource>>,
    stats: Arc<CaptureStats>,
}

impl StreamSlots {
    pub fn new(stats: Arc<CaptureStats>) -> Self {
        Self {
            capture: Mutex::new(None),
            playback: Mutex::new(None),
            stats,
        }
    }

    /// Callback body. `input` feeds the capture slot, `output` is filled from the playback slot.
    pub fn render(&self, input: &[f32], output: &mut [f32]) {
        if !input.is_empty() {
            self.stats.record_capture_callback();
            match self.capture.try_lock() {
                Some(mut slot) => {
                    if let Some(buffer) = slot.as_mut() {
                        buffer.append(input);
                    }
                }
                None => self.stats.record_contended(),
            }
        }

        if !output.is_empty() {
            match self.playback.try_lock() {
                Some(mut slot) => match slot.as_mut() {
                    Some(source) => {
                        let frames = source.read(output);
                        self.stats.record_playback_callback(frames);
                    }
                    None => output.fill(0.0),
                },
                None => {
                    output.fill(0.0);
                    self.stats.record_contended();
                }
            }
        }
    }

    /// Build the port callback. Holds a reference to these slots, not to any buffer.
    pub fn callback(self: &Arc<Self>) -> PortCallback {
        let slots = Arc::clone(self);
        Arc::new(move |input: &[f32], output: &mut [f32]| slots.render(input, output))
    }

    pub fn install_capture(&self, buffer: CaptureBuffer) {
        *self.capture.lock() = Some(buffer);
    }

    pub fn take_capture(&self) -> Option<CaptureBuffer> {
        self.capture.lock().take()
    }

    pub fn install_loop(&self, source: LoopSource) {
        *self.playback.lock() = Some(source);
    }

    pub fn take_loop(&self) -> Option<LoopSource> {
        self.playback.lock().take()
    }

    pub fn has_capture(&self) -> bool {
        self.capture.lock().is_some()
    }

    pub fn has_loop(&self) -> bool {
        self.playback.lock().is_some()
    }

    /// Release whatever is installed.
    pub fn clear(&self) {
        self.take_capture();
        self.take_loop();
    }
}
