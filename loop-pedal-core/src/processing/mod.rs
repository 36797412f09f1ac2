pub mod capture_buffer;
pub mod frame_store;
pub mod loop_source;
pub mod segment_pool;
pub mod wav_format;
