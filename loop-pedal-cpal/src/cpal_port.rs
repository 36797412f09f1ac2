//! cpal audio port.
//!
//! Opens capture, playback, or duplex streams on the host's devices and delivers
//! interleaved `f32` buffers to the registered `PortCallback`. Devices that only offer
//! 16-bit streams are converted through a scratch buffer allocated when the stream is built.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleRate, SizedSample, Stream, StreamConfig, StreamError};
use parking_lot::Mutex;

use loop_pedal_core::models::audio_models::{AudioDevice, FrameFormat, PortDirection};
use loop_pedal_core::models::error::LoopError;
use loop_pedal_core::traits::audio_port::{AudioPort, PortCallback};

/// Device sample formats in order of preference.
const PREFERRED_FORMATS: [cpal::SampleFormat; 3] =
    [cpal::SampleFormat::F32, cpal::SampleFormat::I16, cpal::SampleFormat::U16];

/// Frames converted per pass; larger device buffers are handed over in slices.
const SCRATCH_FRAMES: usize = 4096;

/// Which side of the host a device is looked up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Input,
    Output,
}

/// A device together with the sample format negotiated for it.
struct NegotiatedDevice {
    device: Device,
    sample_format: cpal::SampleFormat,
}

/// State negotiated by `open`, used to build streams on every `start`.
struct OpenedPort {
    direction: PortDirection,
    input: Option<NegotiatedDevice>,
    output: Option<NegotiatedDevice>,
    config: StreamConfig,
    callback: PortCallback,
    info: AudioDevice,
}

/// Slot for a fatal error reported by a running stream.
type ErrorSlot = Arc<Mutex<Option<String>>>;

/// [`AudioPort`] backed by the default cpal host.
///
/// `start` builds and plays the stream(s); `stop` drops them, which joins the backend's
/// audio thread before returning. A duplex port runs one input and one output stream that
/// share the same callback. If a device disappears while running, the next `stop` reports it.
pub struct CpalPort {
    capture_pattern: Option<String>,
    playback_pattern: Option<String>,
    opened: Option<OpenedPort>,
    streams: Vec<Stream>,
    stream_failure: ErrorSlot,
}

impl CpalPort {
    /// Port using the host default device(s).
    pub fn default_device() -> Self {
        Self::with_devices(None, None)
    }

    /// Port using devices whose names contain the given patterns (case-insensitive).
    ///
    /// The capture pattern applies to capture and duplex directions, the playback
    /// pattern to playback and duplex directions.
    pub fn with_devices(capture_pattern: Option<String>, playback_pattern: Option<String>) -> Self {
        Self {
            capture_pattern,
            playback_pattern,
            opened: None,
            streams: Vec::new(),
            stream_failure: Arc::new(Mutex::new(None)),
        }
    }

    fn build_streams(opened: &OpenedPort, failure: &ErrorSlot) -> Result<Vec<Stream>, String> {
        let mut streams = Vec::with_capacity(2);
        let scratch_len = SCRATCH_FRAMES * opened.config.channels.max(1) as usize;

        if let Some(input) = &opened.input {
            let callback = Arc::clone(&opened.callback);
            let errors = Arc::clone(failure);
            let config = &opened.config;
            let stream = match input.sample_format {
                cpal::SampleFormat::F32 => build_input::<f32>(&input.device, config, callback, errors, scratch_len),
                cpal::SampleFormat::I16 => build_input::<i16>(&input.device, config, callback, errors, scratch_len),
                cpal::SampleFormat::U16 => build_input::<u16>(&input.device, config, callback, errors, scratch_len),
                other => return Err(format!("unsupported input sample format {other:?}")),
            }
            .map_err(|e| format!("failed to build input stream: {e}"))?;
            streams.push(stream);
        }

        if let Some(output) = &opened.output {
            let callback = Arc::clone(&opened.callback);
            let errors = Arc::clone(failure);
            let config = &opened.config;
            let stream = match output.sample_format {
                cpal::SampleFormat::F32 => build_output::<f32>(&output.device, config, callback, errors, scratch_len),
                cpal::SampleFormat::I16 => build_output::<i16>(&output.device, config, callback, errors, scratch_len),
                cpal::SampleFormat::U16 => build_output::<u16>(&output.device, config, callback, errors, scratch_len),
                other => return Err(format!("unsupported output sample format {other:?}")),
            }
            .map_err(|e| format!("failed to build output stream: {e}"))?;
            streams.push(stream);
        }

        for stream in &streams {
            stream.play().map_err(|e| format!("failed to play stream: {e}"))?;
        }
        Ok(streams)
    }
}

fn build_input<T>(
    device: &Device,
    config: &StreamConfig,
    callback: PortCallback,
    failure: ErrorSlot,
    scratch_len: usize,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut scratch = vec![0.0f32; scratch_len];
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| deliver_input(data, &mut scratch, &callback),
        move |err| record_stream_error("capture", err, &failure),
        None,
    )
}

fn build_output<T>(
    device: &Device,
    config: &StreamConfig,
    callback: PortCallback,
    failure: ErrorSlot,
    scratch_len: usize,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch = vec![0.0f32; scratch_len];
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| render_output(data, &mut scratch, &callback),
        move |err| record_stream_error("playback", err, &failure),
        None,
    )
}

/// Convert device samples to `f32` slice by slice and hand each slice to the callback.
fn deliver_input<T>(data: &[T], scratch: &mut [f32], callback: &PortCallback)
where
    T: Sample,
    f32: FromSample<T>,
{
    for chunk in data.chunks(scratch.len().max(1)) {
        let converted = &mut scratch[..chunk.len()];
        for (dst, &src) in converted.iter_mut().zip(chunk) {
            *dst = src.to_sample::<f32>();
        }
        callback(&*converted, &mut []);
    }
}

/// Let the callback render `f32` slices and convert them into the device buffer.
fn render_output<T>(data: &mut [T], scratch: &mut [f32], callback: &PortCallback)
where
    T: Sample + FromSample<f32>,
{
    for chunk in data.chunks_mut(scratch.len().max(1)) {
        let rendered = &mut scratch[..chunk.len()];
        callback(&[], rendered);
        for (dst, &src) in chunk.iter_mut().zip(rendered.iter()) {
            *dst = T::from_sample(src);
        }
    }
}

fn record_stream_error(side: &str, err: StreamError, failure: &ErrorSlot) {
    log::error!("Audio {side} stream error: {err}");
    if matches!(err, StreamError::DeviceNotAvailable) {
        *failure.lock() = Some(err.to_string());
    }
}

impl AudioPort for CpalPort {
    fn open(&mut self, direction: PortDirection, format: &FrameFormat, callback: PortCallback) -> Result<(), LoopError> {
        if self.opened.is_some() {
            return Err(LoopError::DeviceOpen {
                direction,
                reason: "port already open".into(),
            });
        }
        let open_err = |reason: String| LoopError::DeviceOpen { direction, reason };

        let host = cpal::default_host();
        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let input = if direction.captures() {
            let device = resolve_device(&host, Side::Input, self.capture_pattern.as_deref()).map_err(open_err)?;
            let sample_format = check_support(&device, Side::Input, format).map_err(open_err)?;
            Some(NegotiatedDevice { device, sample_format })
        } else {
            None
        };
        let output = if direction.plays() {
            let device = resolve_device(&host, Side::Output, self.playback_pattern.as_deref()).map_err(open_err)?;
            let sample_format = check_support(&device, Side::Output, format).map_err(open_err)?;
            Some(NegotiatedDevice { device, sample_format })
        } else {
            None
        };

        let name = [input.as_ref(), output.as_ref()]
            .into_iter()
            .flatten()
            .map(|d| d.device.name().unwrap_or_else(|_| "<unknown>".into()))
            .collect::<Vec<_>>()
            .join(" / ");
        let is_default = self.capture_pattern.is_none() && self.playback_pattern.is_none();

        self.opened = Some(OpenedPort {
            direction,
            input,
            output,
            config,
            callback,
            info: AudioDevice {
                name,
                direction,
                is_default,
            },
        });
        *self.stream_failure.lock() = None;
        Ok(())
    }

    fn start(&mut self) -> Result<(), LoopError> {
        let opened = self.opened.as_ref().ok_or_else(|| LoopError::DeviceStart {
            direction: PortDirection::Duplex,
            reason: "port is not open".into(),
        })?;
        if !self.streams.is_empty() {
            return Ok(());
        }

        self.streams = Self::build_streams(opened, &self.stream_failure).map_err(|reason| LoopError::DeviceStart {
            direction: opened.direction,
            reason,
        })?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), LoopError> {
        // Dropping a cpal stream joins its audio thread.
        self.streams.clear();
        match self.stream_failure.lock().take() {
            Some(reason) => Err(LoopError::DeviceStop {
                direction: self.opened.as_ref().map_or(PortDirection::Duplex, |o| o.direction),
                reason,
            }),
            None => Ok(()),
        }
    }

    fn close(&mut self) {
        self.streams.clear();
        self.opened = None;
    }

    fn is_open(&self) -> bool {
        self.opened.is_some()
    }

    fn is_running(&self) -> bool {
        !self.streams.is_empty()
    }

    fn device_info(&self) -> AudioDevice {
        match &self.opened {
            Some(opened) => opened.info.clone(),
            None => AudioDevice {
                name: "<closed>".into(),
                direction: PortDirection::Duplex,
                is_default: self.capture_pattern.is_none() && self.playback_pattern.is_none(),
            },
        }
    }
}

/// Find a device whose name contains `pattern`, falling back to the host default.
fn resolve_device(host: &cpal::Host, side: Side, pattern: Option<&str>) -> Result<Device, String> {
    if let Some(pattern) = pattern {
        let pat = pattern.to_lowercase();
        let devices = match side {
            Side::Input => host.input_devices(),
            Side::Output => host.output_devices(),
        }
        .map_err(|e| format!("failed to enumerate devices: {e}"))?;

        let found = devices
            .into_iter()
            .find(|d| d.name().map(|n| n.to_lowercase().contains(&pat)).unwrap_or(false));
        match found {
            Some(device) => return Ok(device),
            None => log::warn!("No {:?} device matches '{}'; using the default", side, pattern),
        }
    }

    match side {
        Side::Input => host.default_input_device(),
        Side::Output => host.default_output_device(),
    }
    .ok_or_else(|| format!("no default {:?} device", side).to_lowercase())
}

/// Pick the preferred sample format among `(channels, min_rate, max_rate, format)`
/// ranges that cover the requested channel count and rate.
fn pick_sample_format<I>(ranges: I, format: &FrameFormat) -> Option<cpal::SampleFormat>
where
    I: IntoIterator<Item = (u16, u32, u32, cpal::SampleFormat)>,
{
    let offered: Vec<cpal::SampleFormat> = ranges
        .into_iter()
        .filter(|&(channels, min_rate, max_rate, _)| {
            channels == format.channels && min_rate <= format.sample_rate && format.sample_rate <= max_rate
        })
        .map(|(_, _, _, sample_format)| sample_format)
        .collect();
    PREFERRED_FORMATS.into_iter().find(|f| offered.contains(f))
}

/// Negotiate a sample format at the requested channel count and rate.
fn check_support(device: &Device, side: Side, format: &FrameFormat) -> Result<cpal::SampleFormat, String> {
    let supported = match side {
        Side::Input => device.supported_input_configs().map(|c| c.collect::<Vec<_>>()),
        Side::Output => device.supported_output_configs().map(|c| c.collect::<Vec<_>>()),
    }
    .map_err(|e| format!("cannot query device configs: {e}"))?;

    let ranges = supported
        .iter()
        .map(|c| (c.channels(), c.min_sample_rate().0, c.max_sample_rate().0, c.sample_format()));
    match pick_sample_format(ranges, format) {
        Some(sample_format) => {
            if sample_format != cpal::SampleFormat::F32 {
                log::info!("{:?} device streams {:?}; converting to f32", side, sample_format);
            }
            Ok(sample_format)
        }
        None => {
            let name = device.name().unwrap_or_else(|_| "<unknown>".into());
            Err(format!(
                "'{}' does not support f32, i16 or u16 at {} Hz with {} channels",
                name, format.sample_rate, format.channels
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loop_pedal_core::models::audio_models::SampleFormat;

    fn stereo_48k() -> FrameFormat {
        FrameFormat::new(SampleFormat::F32, 2, 48000)
    }

    #[test]
    fn prefers_f32_then_falls_back_to_16_bit() {
        let both = [
            (2, 8000, 96000, cpal::SampleFormat::I16),
            (2, 8000, 96000, cpal::SampleFormat::F32),
        ];
        assert_eq!(pick_sample_format(both, &stereo_48k()), Some(cpal::SampleFormat::F32));

        let int_only = [(2, 44100, 48000, cpal::SampleFormat::I16), (2, 44100, 48000, cpal::SampleFormat::U16)];
        assert_eq!(pick_sample_format(int_only, &stereo_48k()), Some(cpal::SampleFormat::I16));
    }

    #[test]
    fn mismatched_ranges_are_unsupported() {
        let ranges = [
            (1, 8000, 96000, cpal::SampleFormat::F32),
            (2, 8000, 44100, cpal::SampleFormat::F32),
            (2, 8000, 96000, cpal::SampleFormat::I32),
        ];
        assert_eq!(pick_sample_format(ranges, &stereo_48k()), None);
    }

    #[test]
    fn int16_input_reaches_callback_as_f32_slices() {
        let seen = Arc::new(Mutex::new(Vec::<Vec<f32>>::new()));
        let sink = Arc::clone(&seen);
        let callback: PortCallback = Arc::new(move |input: &[f32], _: &mut [f32]| sink.lock().push(input.to_vec()));

        let mut scratch = vec![0.0f32; 4];
        let data = [0i16, i16::MIN, 16384, -16384, 0, 8192];
        deliver_input(&data, &mut scratch, &callback);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], vec![0.0, -1.0, 0.5, -0.5]);
        assert_eq!(seen[1], vec![0.0, 0.25]);
    }

    #[test]
    fn rendered_f32_is_converted_for_16_bit_output() {
        let callback: PortCallback = Arc::new(|_: &[f32], output: &mut [f32]| output.fill(-1.0));

        let mut scratch = vec![0.0f32; 4];
        let mut signed = [7i16; 6];
        render_output(&mut signed, &mut scratch, &callback);
        assert_eq!(signed, [i16::MIN; 6]);

        let mut unsigned = [7u16; 3];
        render_output(&mut unsigned, &mut scratch, &callback);
        assert_eq!(unsigned, [0u16; 3]);
    }
}
