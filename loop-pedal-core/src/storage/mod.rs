pub mod metadata;
pub mod wav_codec;
