use crate::models::error::LoopError;
use crate::models::take::PersistedTake;
use crate::processing::frame_store::FrameStore;

/// Persistence of finished takes.
///
/// Both operations run on the control thread during the Recording → Looping transition.
/// Default implementation: [`crate::storage::wav_codec::WavFileCodec`].
pub trait FrameCodec: Send {
    /// Write `store` to durable storage.
    fn encode(&mut self, store: &FrameStore) -> Result<PersistedTake, LoopError>;

    /// Read a previously encoded take back into memory.
    fn decode(&mut self, take: &PersistedTake) -> Result<FrameStore, LoopError>;

    /// Codec identifier (e.g., "wav").
    fn name(&self) -> &str;
}
