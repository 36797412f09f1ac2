use thiserror::Error;

use super::audio_models::PortDirection;

/// Errors raised by the loop pedal core and its collaborators.
///
/// Device and codec failures are fatal for the session; see [`LoopError::exit_code`].
/// Dropped capture frames are not errors and are reported through diagnostics instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoopError {
    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("failed to open {direction} device: {reason}")]
    DeviceOpen {
        direction: PortDirection,
        reason: String,
    },

    #[error("failed to start {direction} device: {reason}")]
    DeviceStart {
        direction: PortDirection,
        reason: String,
    },

    #[error("failed to stop {direction} device: {reason}")]
    DeviceStop {
        direction: PortDirection,
        reason: String,
    },

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("decoding failed: {0}")]
    DecodingFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl LoopError {
    /// Process exit status for this failure site.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigurationFailed(_) => 1,
            Self::DeviceOpen { direction, .. } => match direction {
                PortDirection::Playback => 6,
                PortDirection::Capture | PortDirection::Duplex => 2,
            },
            Self::DeviceStart { direction, .. } => match direction {
                PortDirection::Playback => 7,
                PortDirection::Capture | PortDirection::Duplex => 3,
            },
            Self::EncodingFailed(_) | Self::StorageError(_) => 4,
            Self::DecodingFailed(_) => 5,
            Self::DeviceStop { .. } => 8,
        }
    }
}
