use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_models::{FrameFormat, SampleFormat};
use crate::models::error::LoopError;
use crate::models::take::PersistedTake;
use crate::processing::frame_store::FrameStore;
use crate::processing::wav_format;
use crate::traits::frame_codec::FrameCodec;

/// Samples converted per write call.
const ENCODE_CHUNK_SAMPLES: usize = 8192;

/// Streaming WAV file writer.
///
/// ## File Format
/// ```text
/// [44-byte WAV header]
/// [little-endian samples: 32-bit float or 16-bit PCM...]
/// ```
///
/// The header is written with a zero data size on `open` and patched on `close`.
pub struct WavWriter {
    file_path: PathBuf,
    format: FrameFormat,
    file: Option<BufWriter<File>>,
    total_bytes_written: u64,
}

impl WavWriter {
    pub fn new(file_path: PathBuf, format: FrameFormat) -> Self {
        Self {
            file_path,
            format,
            file: None,
            total_bytes_written: 0,
        }
    }

    /// Create the file and write the initial 44-byte WAV header.
    pub fn open(&mut self) -> Result<(), LoopError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| LoopError::EncodingFailed(format!("failed to create directory: {}", e)))?;
            }
        }

        let file = File::create(&self.file_path)
            .map_err(|e| LoopError::EncodingFailed(format!("failed to create file: {}", e)))?;
        self.file = Some(BufWriter::new(file));
        self.total_bytes_written = 0;

        let header = wav_format::generate_wav_header(&self.format, 0);
        self.write_raw(&header)
    }

    /// Append interleaved `f32` samples in the writer's sample format.
    pub fn write_samples(&mut self, samples: &[f32]) -> Result<(), LoopError> {
        for chunk in samples.chunks(ENCODE_CHUNK_SAMPLES) {
            let bytes = wav_format::encode_samples(chunk, self.format.sample_format);
            self.write_raw(&bytes)?;
        }
        Ok(())
    }

    /// Finalize the file: patch the header sizes and compute the SHA-256 checksum.
    pub fn close(&mut self) -> Result<PersistedTake, LoopError> {
        let mut writer = self
            .file
            .take()
            .ok_or_else(|| LoopError::EncodingFailed("file is not open".into()))?;
        let data_size = self.total_bytes_written - wav_format::WAV_HEADER_SIZE as u64;

        let mut header = wav_format::generate_wav_header(&self.format, 0);
        wav_format::patch_data_size(&mut header, data_size).map_err(LoopError::EncodingFailed)?;
        wav_format::patch_file_size(&mut header, self.total_bytes_written).map_err(LoopError::EncodingFailed)?;

        let io_err = |e: std::io::Error| LoopError::EncodingFailed(e.to_string());
        writer.seek(SeekFrom::Start(0)).map_err(io_err)?;
        writer.write_all(&header).map_err(io_err)?;
        writer.flush().map_err(io_err)?;
        drop(writer);

        let checksum = sha256_file(&self.file_path)?;
        Ok(PersistedTake {
            file_path: self.file_path.clone(),
            checksum,
            bytes_written: self.total_bytes_written,
        })
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), LoopError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| LoopError::EncodingFailed("file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| LoopError::EncodingFailed(format!("write failed: {}", e)))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }
}

/// [`FrameCodec`] persisting each take as a WAV file at a fixed path.
///
/// Every take overwrites the previous one; the pedal only holds one loop.
pub struct WavFileCodec {
    file_path: PathBuf,
}

impl WavFileCodec {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

impl FrameCodec for WavFileCodec {
    fn encode(&mut self, store: &FrameStore) -> Result<PersistedTake, LoopError> {
        let mut writer = WavWriter::new(self.file_path.clone(), store.format());
        writer.open()?;
        writer.write_samples(store.samples())?;
        writer.close()
    }

    fn decode(&mut self, take: &PersistedTake) -> Result<FrameStore, LoopError> {
        let bytes = fs::read(&take.file_path)
            .map_err(|e| LoopError::DecodingFailed(format!("failed to read {}: {}", take.file_path.display(), e)))?;

        if !take.checksum.is_empty() && hex_encode(&Sha256::digest(&bytes)) != take.checksum {
            return Err(LoopError::DecodingFailed("checksum mismatch".into()));
        }

        let decode_err = |e: hound::Error| LoopError::DecodingFailed(e.to_string());
        let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(decode_err)?;
        let spec = reader.spec();
        let sample_format = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => SampleFormat::F32,
            (hound::SampleFormat::Int, 16) => SampleFormat::I16,
            (encoding, bits) => {
                return Err(LoopError::DecodingFailed(format!(
                    "unsupported encoding: {:?} at {} bits",
                    encoding, bits
                )))
            }
        };
        if spec.channels == 0 {
            return Err(LoopError::DecodingFailed("zero channels".into()));
        }

        let samples: Vec<f32> = match sample_format {
            SampleFormat::F32 => reader.into_samples::<f32>().collect::<Result<Vec<f32>, _>>(),
            SampleFormat::I16 => reader
                .into_samples::<i16>()
                .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
                .collect::<Result<Vec<f32>, _>>(),
        }
        .map_err(decode_err)?;

        let format = FrameFormat::new(sample_format, spec.channels, spec.sample_rate);
        Ok(FrameStore::from_samples(format, samples))
    }

    fn name(&self) -> &str {
        "wav"
    }
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, LoopError> {
    let data = fs::read(path)
        .map_err(|e| LoopError::EncodingFailed(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
