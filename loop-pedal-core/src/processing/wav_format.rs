/// WAV file format utilities.
///
/// Generates standard 44-byte RIFF WAV headers and encodes in-memory `f32` samples
/// in the persisted sample encoding. Reading takes back goes through `hound`.
use crate::models::audio_models::{FrameFormat, SampleFormat};

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// WAVE format tag for integer PCM.
pub const FORMAT_PCM: u16 = 1;

/// WAVE format tag for IEEE float.
pub const FORMAT_IEEE_FLOAT: u16 = 3;

fn format_tag(sample_format: SampleFormat) -> u16 {
    match sample_format {
        SampleFormat::F32 => FORMAT_IEEE_FLOAT,
        SampleFormat::I16 => FORMAT_PCM,
    }
}

/// Generate a 44-byte WAV RIFF header.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_size)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (format chunk size)
/// [20-21]  format tag (1 = PCM, 3 = IEEE float)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: &FrameFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let bit_depth = format.sample_format.bits_per_sample();
    let block_align = format.channels * bit_depth / 8;
    let byte_rate = format.sample_rate * block_align as u32;
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&format_tag(format.sample_format).to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Largest data chunk a RIFF file can describe: the chunk size field at offset 4
/// must still hold `36 + data_size`.
pub const MAX_DATA_SIZE: u64 = u32::MAX as u64 - 36;

/// Checked conversion of a data chunk size to the 32-bit header field.
pub fn checked_data_size(data_size: u64) -> Result<u32, String> {
    if data_size > MAX_DATA_SIZE {
        return Err(format!(
            "take of {} bytes exceeds the WAV limit of {} bytes",
            data_size, MAX_DATA_SIZE
        ));
    }
    Ok(data_size as u32)
}

/// Patch the file-size field at offset 4 (RIFF chunk size = file_size - 8).
pub fn patch_file_size(header: &mut [u8], total_file_size: u64) -> Result<(), String> {
    let data_size = total_file_size.saturating_sub(WAV_HEADER_SIZE as u64);
    let chunk_size = 36 + checked_data_size(data_size)?;
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    Ok(())
}

/// Patch the data-size field at offset 40.
pub fn patch_data_size(header: &mut [u8], data_size: u64) -> Result<(), String> {
    let data_size_u32 = checked_data_size(data_size)?;
    header[40..44].copy_from_slice(&data_size_u32.to_le_bytes());
    Ok(())
}

/// Encode `f32` samples in the persisted sample format (little-endian).
///
/// 16-bit conversion clamps out-of-range values.
pub fn encode_samples(samples: &[f32], sample_format: SampleFormat) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * sample_format.bytes_per_sample());
    match sample_format {
        SampleFormat::F32 => {
            for &sample in samples {
                data.extend_from_slice(&sample.to_le_bytes());
            }
        }
        SampleFormat::I16 => {
            for &sample in samples {
                let clamped = sample.clamp(-1.0, 1.0);
                let int16_value = (clamped * i16::MAX as f32) as i16;
                data.extend_from_slice(&int16_value.to_le_bytes());
            }
        }
    }
    data
}
