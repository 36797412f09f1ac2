use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::models::audio_models::{CaptureDiagnostics, FrameFormat, PortDirection};
use crate::models::config::{PedalConfiguration, Persistence, PortWiring};
use crate::models::error::LoopError;
use crate::models::state::LoopState;
use crate::models::take::{TakeMetadata, TakeSummary};
use crate::processing::capture_buffer::{CaptureBuffer, CaptureStats};
use crate::processing::frame_store::FrameStore;
use crate::processing::loop_source::LoopSource;
use crate::processing::segment_pool::{segment_pool, SegmentFeeder};
use crate::session::stream_slots::StreamSlots;
use crate::storage::metadata;
use crate::storage::wav_codec::WavFileCodec;
use crate::traits::audio_port::{AudioPort, PortCallback};
use crate::traits::frame_codec::FrameCodec;
use crate::traits::loop_delegate::LoopDelegate;
use crate::traits::trigger_source::TriggerSource;

/// Audio ports driven by the controller.
pub enum Ports<P> {
    /// One device for both directions, running for the whole session.
    Duplex(P),
    /// Capture runs only while recording, playback only while looping.
    Split { capture: P, playback: P },
}

impl<P> Ports<P> {
    pub fn wiring(&self) -> PortWiring {
        match self {
            Self::Duplex(_) => PortWiring::Duplex,
            Self::Split { .. } => PortWiring::Split,
        }
    }
}

/// Single-button loop pedal.
///
/// Each trigger edge advances `idle → recording → looping → idle`:
/// ```text
/// [Trigger] → LoopController ── start/stop ──→ [AudioPort]
///                  │                              │ callback
///                  └─ install/take ─→ [StreamSlots] ←┘
///                                       ├─ CaptureBuffer (recording)
///                                       └─ LoopSource    (looping)
/// ```
///
/// All transitions run on the caller's thread. The callback only ever sees the slots.
pub struct LoopController<P: AudioPort, T: TriggerSource> {
    ports: Ports<P>,
    trigger: T,
    config: PedalConfiguration,
    format: FrameFormat,
    state: LoopState,
    started: bool,

    // Shared with the port callback
    slots: Arc<StreamSlots>,
    stats: Arc<CaptureStats>,

    // Control-side half of the capture segment pool, present while recording
    feeder: Option<SegmentFeeder>,

    codec: Option<Box<dyn FrameCodec>>,
    delegate: Option<Arc<dyn LoopDelegate>>,
    last_take: Option<TakeSummary>,
    reported_drops: u64,
}

impl<P: AudioPort, T: TriggerSource> LoopController<P, T> {
    pub fn new(ports: Ports<P>, trigger: T, config: PedalConfiguration) -> Result<Self, LoopError> {
        config.validate().map_err(LoopError::ConfigurationFailed)?;
        if ports.wiring() != config.wiring {
            return Err(LoopError::ConfigurationFailed(format!(
                "configured for {:?} wiring but given {:?} ports",
                config.wiring,
                ports.wiring()
            )));
        }

        let codec: Option<Box<dyn FrameCodec>> = match &config.persistence {
            Persistence::InMemory => None,
            Persistence::File { path } => Some(Box::new(WavFileCodec::new(path.clone()))),
        };
        let stats = Arc::new(CaptureStats::new());

        Ok(Self {
            ports,
            trigger,
            format: config.frame_format(),
            config,
            state: LoopState::Idle,
            started: false,
            slots: Arc::new(StreamSlots::new(Arc::clone(&stats))),
            stats,
            feeder: None,
            codec,
            delegate: None,
            last_take: None,
            reported_drops: 0,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn LoopDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn config(&self) -> &PedalConfiguration {
        &self.config
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        self.stats.snapshot()
    }

    /// Summary of the most recent take, once one has been frozen.
    pub fn last_take(&self) -> Option<&TakeSummary> {
        self.last_take.as_ref()
    }

    /// Enter idle. With duplex wiring this opens and starts the device.
    pub fn start(&mut self) -> Result<(), LoopError> {
        if self.started {
            return Ok(());
        }

        let callback = self.slots.callback();
        let opened = match &mut self.ports {
            Ports::Duplex(port) => ensure_running(port, PortDirection::Duplex, &self.format, callback),
            Ports::Split { .. } => Ok(()),
        };
        if let Err(e) = opened {
            return Err(self.fail(e));
        }

        self.started = true;
        log::info!("Entering idle state");
        self.set_state(LoopState::Idle);
        Ok(())
    }

    /// Poll the trigger once and perform at most one transition.
    ///
    /// Without an edge this has no observable effect (while recording it tops up the
    /// capture segment pool). An edge that arrives while a transition runs is discarded,
    /// so the next transition needs a fresh edge. On a fatal error every port and buffer
    /// has been released before the error is returned.
    pub fn advance(&mut self) -> Result<LoopState, LoopError> {
        self.start()?;

        if !self.trigger.poll() {
            if self.state.is_recording() {
                self.service_recording();
            }
            return Ok(self.state);
        }

        log::debug!("Trigger edge: {} -> {}", self.state, self.state.next());
        let result = match self.state {
            LoopState::Idle => self.enter_recording(),
            LoopState::Recording => self
                .leave_recording()
                .and_then(|store| self.enter_looping(store)),
            LoopState::Looping => self.leave_looping(),
        };
        if let Err(e) = result {
            return Err(self.fail(e));
        }

        // Drop any edge latched during the transition.
        self.trigger.poll();
        Ok(self.state)
    }

    /// Poll every `poll_interval_ms` until `running` clears, then shut down.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), LoopError> {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        self.start()?;
        while running.load(Ordering::SeqCst) {
            self.advance()?;
            thread::sleep(interval);
        }
        self.shutdown();
        Ok(())
    }

    /// Stop and close every port and release any buffer or source. Idempotent.
    pub fn shutdown(&mut self) {
        match &mut self.ports {
            Ports::Duplex(port) => release_port(port, PortDirection::Duplex),
            Ports::Split { capture, playback } => {
                release_port(capture, PortDirection::Capture);
                release_port(playback, PortDirection::Playback);
            }
        }
        self.slots.clear();
        self.feeder = None;
        self.started = false;
        if !self.state.is_idle() {
            self.set_state(LoopState::Idle);
        }
    }

    // --- Transitions ---

    fn enter_recording(&mut self) -> Result<(), LoopError> {
        log::info!("Entering recording state");

        let segment_samples = self.config.segment_frames * self.format.samples_per_frame();
        let max_segments = self.config.max_segments();
        let (feeder, supply) = segment_pool(segment_samples, self.config.prealloc_segments, max_segments);

        self.stats.reset_capture();
        self.reported_drops = 0;
        self.slots
            .install_capture(CaptureBuffer::new(self.format, supply, max_segments, Arc::clone(&self.stats)));
        self.feeder = Some(feeder);

        let callback = self.slots.callback();
        if let Ports::Split { capture, .. } = &mut self.ports {
            ensure_running(capture, PortDirection::Capture, &self.format, callback)?;
        }

        self.set_state(LoopState::Recording);
        Ok(())
    }

    fn service_recording(&mut self) {
        if let Some(feeder) = self.feeder.as_mut() {
            feeder.replenish();
        }
        let dropped = self.stats.frames_dropped();
        if dropped > self.reported_drops {
            log::warn!(
                "Dropped {} captured frames (segment pool exhausted or take limit of {}s reached)",
                dropped - self.reported_drops,
                self.config.max_take_secs
            );
            self.reported_drops = dropped;
        }
    }

    /// Quiesce the capture path and freeze what was recorded.
    /// A failed stop is fatal.
    fn leave_recording(&mut self) -> Result<FrameStore, LoopError> {
        if let Ports::Split { capture, .. } = &mut self.ports {
            capture.stop()?;
        }

        let buffer = self.slots.take_capture();
        self.service_recording();
        self.feeder = None;

        let store = match buffer {
            Some(buffer) => buffer.freeze(),
            None => FrameStore::empty(self.format),
        };
        log::info!("Recorded {} frames ({:.2}s)", store.frames(), store.duration_secs());
        Ok(store)
    }

    fn enter_looping(&mut self, store: FrameStore) -> Result<(), LoopError> {
        let mut take = TakeSummary::new(store.frames(), self.stats.frames_dropped(), store.format());

        let store = match self.codec.as_mut() {
            Some(codec) => {
                let persisted = codec.encode(&store)?;
                metadata::write_metadata(&TakeMetadata::for_take(&take, &persisted), &persisted.file_path)?;
                log::info!(
                    "Take {} written to {} via {} ({} bytes, sha256 {})",
                    take.id,
                    persisted.file_path.display(),
                    codec.name(),
                    persisted.bytes_written,
                    persisted.checksum
                );
                let decoded = codec.decode(&persisted)?;
                take.persisted = Some(persisted);
                decoded
            }
            None => store,
        };

        if store.is_empty() {
            log::warn!("Take is empty; looping silence");
        }
        if let Some(ref delegate) = self.delegate {
            delegate.on_take_frozen(&take);
        }
        self.last_take = Some(take);

        log::info!("Entering loop state");
        self.slots.install_loop(LoopSource::new(store));

        let callback = self.slots.callback();
        if let Ports::Split { playback, .. } = &mut self.ports {
            ensure_running(playback, PortDirection::Playback, &self.format, callback)?;
        }

        self.set_state(LoopState::Looping);
        Ok(())
    }

    fn leave_looping(&mut self) -> Result<(), LoopError> {
        if let Ports::Split { playback, .. } = &mut self.ports {
            playback.stop()?;
        }
        drop(self.slots.take_loop());

        log::info!("Entering idle state");
        self.set_state(LoopState::Idle);
        Ok(())
    }

    // --- Internal helpers ---

    fn set_state(&mut self, new_state: LoopState) {
        self.state = new_state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(new_state);
        }
    }

    /// Release everything acquired so far and hand the error back.
    fn fail(&mut self, error: LoopError) -> LoopError {
        log::error!("{}", error);
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(&error);
        }
        self.shutdown();
        error
    }
}

impl<P: AudioPort, T: TriggerSource> Drop for LoopController<P, T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn ensure_running<P: AudioPort>(
    port: &mut P,
    direction: PortDirection,
    format: &FrameFormat,
    callback: PortCallback,
) -> Result<(), LoopError> {
    if !port.is_open() {
        port.open(direction, format, callback)?;
        let device = port.device_info();
        log::info!(
            "Opened {} device '{}' ({} Hz, {} ch)",
            direction,
            device.name,
            format.sample_rate,
            format.channels
        );
    }
    if !port.is_running() {
        port.start()?;
    }
    Ok(())
}

fn release_port<P: AudioPort>(port: &mut P, direction: PortDirection) {
    if port.is_running() {
        if let Err(e) = port.stop() {
            log::warn!("Failed to stop {} device during shutdown: {}", direction, e);
        }
    }
    if port.is_open() {
        port.close();
    }
}
