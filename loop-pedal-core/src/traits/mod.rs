pub mod audio_port;
pub mod frame_codec;
pub mod loop_delegate;
pub mod trigger_source;
