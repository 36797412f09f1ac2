use std::sync::Arc;

use crate::models::audio_models::{AudioDevice, FrameFormat, PortDirection};
use crate::models::error::LoopError;

/// Real-time callback registered with an [`AudioPort`].
///
/// Parameters:
/// - `input`: interleaved `f32` frames delivered by the device (empty for playback-only ports).
/// - `output`: interleaved `f32` frames the device wants filled (empty for capture-only ports).
///
/// The frame count is chosen by the driver, not by the caller. Implementations must not
/// block, allocate or perform I/O.
pub type PortCallback = Arc<dyn Fn(&[f32], &mut [f32]) + Send + Sync + 'static>;

/// Interface for audio hardware ports.
///
/// Implemented by:
/// - `CpalPort` (loop-pedal-cpal)
/// - `MockPort` (controller scenario tests)
///
/// The port value itself is the handle returned by `open`.
pub trait AudioPort {
    /// Negotiate `format` in `direction` and register `callback`. Does not start the stream.
    fn open(
        &mut self,
        direction: PortDirection,
        format: &FrameFormat,
        callback: PortCallback,
    ) -> Result<(), LoopError>;

    /// Begin invoking the callback.
    fn start(&mut self) -> Result<(), LoopError>;

    /// Stop invoking the callback.
    ///
    /// Must be synchronous: once this returns, no callback invocation is running or will run
    /// until the next `start`.
    fn stop(&mut self) -> Result<(), LoopError>;

    /// Release the device. Implies `stop`.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    fn is_running(&self) -> bool;

    /// Information about the device backing this port.
    fn device_info(&self) -> AudioDevice;
}
