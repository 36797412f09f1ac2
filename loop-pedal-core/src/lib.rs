//! # loop-pedal-core
//!
//! Platform-agnostic core of a single-button loop pedal.
//!
//! Provides the idle/recording/looping state machine, real-time capture buffering,
//! seamless loop playback, and optional WAV persistence of each take. Audio backends
//! implement the `AudioPort` trait and plug into the generic `LoopController`.
//!
//! ## Architecture
//!
//! ```text
//! loop-pedal-core (this crate)
//! ├── traits/       ← AudioPort, TriggerSource, FrameCodec, LoopDelegate
//! ├── models/       ← LoopError, LoopState, PedalConfiguration, FrameFormat, TakeSummary
//! ├── processing/   ← SegmentPool, CaptureBuffer, FrameStore, LoopSource, WAV format
//! ├── session/      ← LoopController, StreamSlots
//! └── storage/      ← WavFileCodec, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioDevice, CaptureDiagnostics, FrameFormat, PortDirection, SampleFormat};
pub use models::config::{PedalConfiguration, Persistence, PortWiring};
pub use models::error::LoopError;
pub use models::state::LoopState;
pub use models::take::{PersistedTake, TakeMetadata, TakeSummary};
pub use processing::capture_buffer::{CaptureBuffer, CaptureStats};
pub use processing::frame_store::FrameStore;
pub use processing::loop_source::LoopSource;
pub use session::controller::{LoopController, Ports};
pub use storage::wav_codec::WavFileCodec;
pub use traits::audio_port::{AudioPort, PortCallback};
pub use traits::frame_codec::FrameCodec;
pub use traits::loop_delegate::LoopDelegate;
pub use traits::trigger_source::TriggerSource;
