//! End-to-end controller scenarios against a scripted audio port and trigger.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioDevice, FrameFormat, PortDirection};
use crate::models::config::{PedalConfiguration, Persistence, PortWiring};
use crate::models::error::LoopError;
use crate::models::state::LoopState;
use crate::models::take::TakeSummary;
use crate::session::controller::{LoopController, Ports};
use crate::storage::metadata;
use crate::traits::audio_port::{AudioPort, PortCallback};
use crate::traits::loop_delegate::LoopDelegate;
use crate::traits::trigger_source::TriggerSource;

// --- Mock port ---

#[derive(Default)]
struct MockState {
    callback: Option<PortCallback>,
    direction: Option<PortDirection>,
    open: bool,
    running: bool,
    opens: usize,
    starts: usize,
    stops: usize,
    closes: usize,
    fail_open: bool,
    fail_start: bool,
    fail_stop: bool,
    on_start: Option<Arc<dyn Fn() + Send + Sync>>,
}

/// Port whose "device" is the test itself: callbacks fire only when the test delivers
/// a chunk, and only while the port is running.
#[derive(Clone, Default)]
struct MockPort {
    state: Arc<Mutex<MockState>>,
}

impl MockPort {
    fn failing_open() -> Self {
        let port = Self::default();
        port.state.lock().fail_open = true;
        port
    }

    fn failing_start() -> Self {
        let port = Self::default();
        port.state.lock().fail_start = true;
        port
    }

    fn failing_stop() -> Self {
        let port = Self::default();
        port.state.lock().fail_stop = true;
        port
    }

    fn deliver(&self, input: &[f32], output: &mut [f32]) -> bool {
        let callback = {
            let state = self.state.lock();
            if !state.running {
                return false;
            }
            state.callback.clone()
        };
        match callback {
            Some(callback) => {
                callback(input, output);
                true
            }
            None => false,
        }
    }

    fn capture(&self, input: &[f32]) -> bool {
        self.deliver(input, &mut [])
    }

    fn render(&self, samples: usize) -> Option<Vec<f32>> {
        let mut out = vec![f32::NAN; samples];
        self.deliver(&[], &mut out).then_some(out)
    }

    fn counts(&self) -> (usize, usize, usize, usize) {
        let state = self.state.lock();
        (state.opens, state.starts, state.stops, state.closes)
    }
}

impl AudioPort for MockPort {
    fn open(&mut self, direction: PortDirection, _format: &FrameFormat, callback: PortCallback) -> Result<(), LoopError> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(LoopError::DeviceOpen {
                direction,
                reason: "no such device".into(),
            });
        }
        state.callback = Some(callback);
        state.direction = Some(direction);
        state.open = true;
        state.opens += 1;
        Ok(())
    }

    fn start(&mut self) -> Result<(), LoopError> {
        let hook = {
            let mut state = self.state.lock();
            if state.fail_start {
                return Err(LoopError::DeviceStart {
                    direction: state.direction.unwrap_or(PortDirection::Duplex),
                    reason: "device busy".into(),
                });
            }
            state.running = true;
            state.starts += 1;
            state.on_start.clone()
        };
        if let Some(hook) = hook {
            hook();
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), LoopError> {
        let mut state = self.state.lock();
        if state.fail_stop {
            return Err(LoopError::DeviceStop {
                direction: state.direction.unwrap_or(PortDirection::Duplex),
                reason: "device wedged".into(),
            });
        }
        if state.running {
            state.running = false;
            state.stops += 1;
        }
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        state.running = false;
        state.open = false;
        state.callback = None;
        state.closes += 1;
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn is_running(&self) -> bool {
        self.state.lock().running
    }

    fn device_info(&self) -> AudioDevice {
        AudioDevice {
            name: "mock".into(),
            direction: self.state.lock().direction.unwrap_or(PortDirection::Duplex),
            is_default: true,
        }
    }
}

// --- Trigger and delegate ---

#[derive(Clone, Default)]
struct TestTrigger {
    pending: Arc<AtomicBool>,
}

impl TestTrigger {
    fn press(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }
}

impl TriggerSource for TestTrigger {
    fn poll(&mut self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}

#[derive(Default)]
struct RecordingDelegate {
    states: Mutex<Vec<LoopState>>,
    takes: Mutex<Vec<TakeSummary>>,
    errors: Mutex<Vec<LoopError>>,
}

impl LoopDelegate for RecordingDelegate {
    fn on_state_changed(&self, state: LoopState) {
        self.states.lock().push(state);
    }

    fn on_take_frozen(&self, take: &TakeSummary) {
        self.takes.lock().push(take.clone());
    }

    fn on_error(&self, error: &LoopError) {
        self.errors.lock().push(error.clone());
    }
}

// --- Helpers ---

fn mono_config(wiring: PortWiring) -> PedalConfiguration {
    PedalConfiguration {
        sample_rate: 1000,
        channels: 1,
        wiring,
        segment_frames: 4,
        prealloc_segments: 8,
        max_take_secs: 10.0,
        ..PedalConfiguration::default()
    }
}

fn ramp(start: usize, frames: usize) -> Vec<f32> {
    (start..start + frames).map(|i| i as f32).collect()
}

fn press(controller: &mut LoopController<MockPort, TestTrigger>, trigger: &TestTrigger) -> LoopState {
    trigger.press();
    controller.advance().unwrap()
}

struct SplitRig {
    controller: LoopController<MockPort, TestTrigger>,
    trigger: TestTrigger,
    capture: MockPort,
    playback: MockPort,
}

fn split_rig(config: PedalConfiguration, capture: MockPort, playback: MockPort) -> SplitRig {
    let trigger = TestTrigger::default();
    let controller = LoopController::new(
        Ports::Split {
            capture: capture.clone(),
            playback: playback.clone(),
        },
        trigger.clone(),
        config,
    )
    .unwrap();
    SplitRig {
        controller,
        trigger,
        capture,
        playback,
    }
}

/// Record `chunks` (frame counts) as one continuous mono ramp. Returns total frames fed.
fn feed_ramp(port: &MockPort, chunks: &[usize]) -> usize {
    let mut next = 0;
    for &frames in chunks {
        assert!(port.capture(&ramp(next, frames)));
        next += frames;
    }
    next
}

// --- Scenarios ---

#[test]
fn split_take_loops_seamlessly() {
    let mut rig = split_rig(mono_config(PortWiring::Split), MockPort::default(), MockPort::default());

    assert_eq!(rig.controller.advance().unwrap(), LoopState::Idle);
    assert!(!rig.capture.is_running());
    assert!(!rig.playback.is_open());

    assert_eq!(press(&mut rig.controller, &rig.trigger), LoopState::Recording);
    assert!(rig.capture.is_running());
    let total = feed_ramp(&rig.capture, &[10, 7, 5]);
    assert_eq!(total, 22);

    assert_eq!(press(&mut rig.controller, &rig.trigger), LoopState::Looping);
    assert!(!rig.capture.is_running());
    assert!(rig.playback.is_running());
    assert_eq!(rig.controller.last_take().unwrap().frames, 22);

    let mut played = Vec::new();
    for samples in [16, 16, 18] {
        played.extend(rig.playback.render(samples).unwrap());
    }
    let expected: Vec<f32> = (0..50).map(|i| (i % 22) as f32).collect();
    assert_eq!(played, expected);

    assert_eq!(press(&mut rig.controller, &rig.trigger), LoopState::Idle);
    assert!(!rig.playback.is_running());
    assert!(rig.playback.render(4).is_none());
}

#[test]
fn duplex_take_loops_seamlessly() {
    let port = MockPort::default();
    let trigger = TestTrigger::default();
    let mut controller =
        LoopController::new(Ports::Duplex(port.clone()), trigger.clone(), mono_config(PortWiring::Duplex)).unwrap();

    controller.start().unwrap();
    assert!(port.is_running());
    assert_eq!(port.state.lock().direction, Some(PortDirection::Duplex));

    // Idle: input is ignored, output is silent.
    let mut out = [1.0f32; 4];
    assert!(port.deliver(&ramp(100, 4), &mut out));
    assert_eq!(out, [0.0; 4]);

    press(&mut controller, &trigger);
    let mut next = 0;
    for frames in [10, 7, 5] {
        let mut out = vec![1.0f32; frames];
        assert!(port.deliver(&ramp(next, frames), &mut out));
        assert!(out.iter().all(|&s| s == 0.0));
        next += frames;
    }

    press(&mut controller, &trigger);
    let mut played = Vec::new();
    for samples in [16, 16, 18] {
        let mut out = vec![0.0f32; samples];
        assert!(port.deliver(&ramp(500, samples), &mut out));
        played.extend(out);
    }
    let expected: Vec<f32> = (0..50).map(|i| (i % 22) as f32).collect();
    assert_eq!(played, expected);

    // Device kept running across every transition.
    assert_eq!(port.counts(), (1, 1, 0, 0));
    assert_eq!(press(&mut controller, &trigger), LoopState::Idle);
    assert!(port.is_running());
}

#[test]
fn polls_without_edges_change_nothing() {
    let mut rig = split_rig(mono_config(PortWiring::Split), MockPort::default(), MockPort::default());

    for _ in 0..5 {
        assert_eq!(rig.controller.advance().unwrap(), LoopState::Idle);
    }
    press(&mut rig.controller, &rig.trigger);
    rig.capture.capture(&ramp(0, 3));
    for _ in 0..5 {
        assert_eq!(rig.controller.advance().unwrap(), LoopState::Recording);
    }
    rig.capture.capture(&ramp(3, 3));

    press(&mut rig.controller, &rig.trigger);
    for _ in 0..5 {
        assert_eq!(rig.controller.advance().unwrap(), LoopState::Looping);
    }
    assert_eq!(rig.playback.render(6).unwrap(), ramp(0, 6));
    assert_eq!(rig.capture.counts(), (1, 1, 1, 0));
}

#[test]
fn edge_during_transition_is_discarded() {
    let capture = MockPort::default();
    let mut rig = split_rig(mono_config(PortWiring::Split), capture.clone(), MockPort::default());

    let trigger = rig.trigger.clone();
    capture.state.lock().on_start = Some(Arc::new(move || trigger.press()));

    assert_eq!(press(&mut rig.controller, &rig.trigger), LoopState::Recording);
    assert_eq!(rig.controller.advance().unwrap(), LoopState::Recording);
    assert_eq!(rig.controller.advance().unwrap(), LoopState::Recording);

    // A fresh edge after the transition still moves on.
    assert_eq!(press(&mut rig.controller, &rig.trigger), LoopState::Looping);
}

#[test]
fn next_take_replaces_previous_loop() {
    let mut rig = split_rig(mono_config(PortWiring::Split), MockPort::default(), MockPort::default());

    press(&mut rig.controller, &rig.trigger);
    feed_ramp(&rig.capture, &[4]);
    press(&mut rig.controller, &rig.trigger);
    press(&mut rig.controller, &rig.trigger);

    press(&mut rig.controller, &rig.trigger);
    rig.capture.capture(&[7.0, 8.0, 9.0]);
    press(&mut rig.controller, &rig.trigger);

    assert_eq!(rig.playback.render(5).unwrap(), vec![7.0, 8.0, 9.0, 7.0, 8.0]);
    // Ports stay open between takes and are only restarted.
    assert_eq!(rig.capture.counts(), (1, 2, 2, 0));
    assert_eq!(rig.playback.counts(), (1, 2, 1, 0));
}

#[test]
fn empty_take_loops_silence() {
    let mut rig = split_rig(mono_config(PortWiring::Split), MockPort::default(), MockPort::default());

    press(&mut rig.controller, &rig.trigger);
    assert_eq!(press(&mut rig.controller, &rig.trigger), LoopState::Looping);
    assert!(rig.controller.last_take().unwrap().is_empty());
    assert_eq!(rig.playback.render(8).unwrap(), vec![0.0; 8]);
}

#[test]
fn replenishing_between_callbacks_prevents_drops() {
    let config = PedalConfiguration {
        prealloc_segments: 2,
        ..mono_config(PortWiring::Split)
    };
    let mut rig = split_rig(config, MockPort::default(), MockPort::default());
    press(&mut rig.controller, &rig.trigger);

    for i in 0..10 {
        rig.capture.capture(&ramp(i * 4, 4));
        rig.controller.advance().unwrap();
    }
    assert_eq!(rig.controller.diagnostics().frames_dropped, 0);

    press(&mut rig.controller, &rig.trigger);
    assert_eq!(rig.controller.last_take().unwrap().frames, 40);
}

#[test]
fn exhausted_pool_drops_whole_chunks() {
    let config = PedalConfiguration {
        prealloc_segments: 2,
        ..mono_config(PortWiring::Split)
    };
    let mut rig = split_rig(config, MockPort::default(), MockPort::default());
    press(&mut rig.controller, &rig.trigger);

    for i in 0..4 {
        rig.capture.capture(&ramp(i * 4, 4));
    }
    assert_eq!(rig.controller.diagnostics().frames_dropped, 8);

    rig.controller.advance().unwrap();
    rig.capture.capture(&ramp(100, 4));

    press(&mut rig.controller, &rig.trigger);
    let take = rig.controller.last_take().unwrap();
    assert_eq!(take.frames, 12);
    assert_eq!(take.dropped_frames, 8);

    let mut expected = ramp(0, 8);
    expected.extend(ramp(100, 4));
    assert_eq!(rig.playback.render(12).unwrap(), expected);
}

#[test]
fn take_limit_caps_recording() {
    let config = PedalConfiguration {
        max_take_secs: 0.01,
        ..mono_config(PortWiring::Split)
    };
    let mut rig = split_rig(config, MockPort::default(), MockPort::default());
    press(&mut rig.controller, &rig.trigger);

    for i in 0..5 {
        rig.capture.capture(&ramp(i * 4, 4));
        rig.controller.advance().unwrap();
    }

    press(&mut rig.controller, &rig.trigger);
    let take = rig.controller.last_take().unwrap();
    assert_eq!(take.frames, 12);
    assert_eq!(take.dropped_frames, 8);
}

#[test]
fn capture_open_failure_is_fatal() {
    let mut rig = split_rig(mono_config(PortWiring::Split), MockPort::failing_open(), MockPort::default());
    let delegate = Arc::new(RecordingDelegate::default());
    rig.controller.set_delegate(delegate.clone());

    rig.trigger.press();
    let err = rig.controller.advance().unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(rig.controller.state(), LoopState::Idle);
    assert_eq!(delegate.errors.lock().as_slice(), &[err]);
    assert!(!rig.capture.is_open());
    assert!(!rig.playback.is_open());
}

#[test]
fn playback_start_failure_releases_everything() {
    let mut rig = split_rig(mono_config(PortWiring::Split), MockPort::default(), MockPort::failing_start());

    press(&mut rig.controller, &rig.trigger);
    feed_ramp(&rig.capture, &[4]);

    rig.trigger.press();
    let err = rig.controller.advance().unwrap_err();
    assert!(matches!(
        err,
        LoopError::DeviceStart {
            direction: PortDirection::Playback,
            ..
        }
    ));
    assert_eq!(err.exit_code(), 7);
    assert_eq!(rig.controller.state(), LoopState::Idle);
    assert!(!rig.capture.is_open());
    assert!(!rig.playback.is_open());
    assert_eq!(rig.playback.counts().3, 1);
}

#[test]
fn capture_stop_failure_is_fatal() {
    let capture = MockPort::default();
    let mut rig = split_rig(mono_config(PortWiring::Split), capture.clone(), MockPort::default());
    let delegate = Arc::new(RecordingDelegate::default());
    rig.controller.set_delegate(delegate.clone());

    press(&mut rig.controller, &rig.trigger);
    feed_ramp(&rig.capture, &[4]);
    capture.state.lock().fail_stop = true;

    rig.trigger.press();
    let err = rig.controller.advance().unwrap_err();
    assert!(matches!(
        err,
        LoopError::DeviceStop {
            direction: PortDirection::Capture,
            ..
        }
    ));
    assert_eq!(err.exit_code(), 8);
    assert_eq!(rig.controller.state(), LoopState::Idle);
    assert!(!rig.capture.is_open());
    assert!(rig.controller.last_take().is_none());
    assert_eq!(delegate.errors.lock().as_slice(), &[err]);
}

#[test]
fn playback_stop_failure_is_fatal() {
    let mut rig = split_rig(mono_config(PortWiring::Split), MockPort::default(), MockPort::failing_stop());

    press(&mut rig.controller, &rig.trigger);
    feed_ramp(&rig.capture, &[4]);
    assert_eq!(press(&mut rig.controller, &rig.trigger), LoopState::Looping);

    rig.trigger.press();
    let err = rig.controller.advance().unwrap_err();
    assert_eq!(err.exit_code(), 8);
    assert_eq!(rig.controller.state(), LoopState::Idle);
    assert!(!rig.capture.is_open());
    assert!(!rig.playback.is_open());
}

#[test]
fn duplex_open_failure_surfaces_from_start() {
    let trigger = TestTrigger::default();
    let mut controller =
        LoopController::new(Ports::Duplex(MockPort::failing_open()), trigger, mono_config(PortWiring::Duplex)).unwrap();
    assert_eq!(controller.start().unwrap_err().exit_code(), 2);
    assert_eq!(controller.advance().unwrap_err().exit_code(), 2);
}

#[test]
fn mismatched_wiring_is_rejected() {
    let result = LoopController::new(
        Ports::Duplex(MockPort::default()),
        TestTrigger::default(),
        mono_config(PortWiring::Split),
    );
    assert!(matches!(result, Err(LoopError::ConfigurationFailed(_))));

    let invalid = PedalConfiguration {
        channels: 0,
        ..mono_config(PortWiring::Duplex)
    };
    let result = LoopController::new(Ports::Duplex(MockPort::default()), TestTrigger::default(), invalid);
    assert_eq!(result.err().map(|e| e.exit_code()), Some(1));
}

#[test]
fn delegate_sees_every_transition() {
    let mut rig = split_rig(mono_config(PortWiring::Split), MockPort::default(), MockPort::default());
    let delegate = Arc::new(RecordingDelegate::default());
    rig.controller.set_delegate(delegate.clone());

    rig.controller.start().unwrap();
    press(&mut rig.controller, &rig.trigger);
    feed_ramp(&rig.capture, &[5]);
    press(&mut rig.controller, &rig.trigger);
    press(&mut rig.controller, &rig.trigger);

    assert_eq!(
        delegate.states.lock().as_slice(),
        &[LoopState::Idle, LoopState::Recording, LoopState::Looping, LoopState::Idle]
    );
    let takes = delegate.takes.lock();
    assert_eq!(takes.len(), 1);
    assert_eq!(takes[0].frames, 5);
    assert!(takes[0].persisted.is_none());
    assert!(delegate.errors.lock().is_empty());
}

#[test]
fn file_persistence_loops_decoded_take() {
    let path: PathBuf = std::env::temp_dir().join("loop_pedal_scenario_take.wav");
    let config = PedalConfiguration {
        persistence: Persistence::File { path: path.clone() },
        ..mono_config(PortWiring::Split)
    };
    let mut rig = split_rig(config, MockPort::default(), MockPort::default());

    press(&mut rig.controller, &rig.trigger);
    feed_ramp(&rig.capture, &[10, 7, 5]);
    press(&mut rig.controller, &rig.trigger);

    let take = rig.controller.last_take().unwrap().clone();
    let persisted = take.persisted.clone().unwrap();
    assert_eq!(persisted.file_path, path);
    assert_eq!(persisted.bytes_written, 44 + 22 * 4);

    let sidecar = metadata::read_metadata(&path).unwrap();
    assert_eq!(sidecar.id, take.id);
    assert_eq!(sidecar.frames, 22);
    assert_eq!(sidecar.checksum, persisted.checksum);

    let expected: Vec<f32> = (0..30).map(|i| (i % 22) as f32).collect();
    assert_eq!(rig.playback.render(30).unwrap(), expected);

    std::fs::remove_file(&path).ok();
    std::fs::remove_file(metadata::metadata_path(&path)).ok();
}

#[test]
fn unwritable_take_path_is_an_encoding_failure() {
    let config = PedalConfiguration {
        persistence: Persistence::File {
            path: PathBuf::from("/proc/loop_pedal/take.wav"),
        },
        ..mono_config(PortWiring::Split)
    };
    let mut rig = split_rig(config, MockPort::default(), MockPort::default());

    press(&mut rig.controller, &rig.trigger);
    feed_ramp(&rig.capture, &[4]);
    rig.trigger.press();
    assert_eq!(rig.controller.advance().unwrap_err().exit_code(), 4);
    assert!(!rig.capture.is_open());
    assert!(!rig.playback.is_open());
}

#[test]
fn run_returns_after_flag_clears() {
    let port = MockPort::default();
    let mut controller = LoopController::new(
        Ports::Duplex(port.clone()),
        TestTrigger::default(),
        mono_config(PortWiring::Duplex),
    )
    .unwrap();

    let running = AtomicBool::new(false);
    controller.run(&running).unwrap();
    assert_eq!(port.counts(), (1, 1, 1, 1));
    assert!(!port.is_open());
}

#[test]
fn shutdown_is_idempotent_and_runs_on_drop() {
    let mut rig = split_rig(mono_config(PortWiring::Split), MockPort::default(), MockPort::default());
    press(&mut rig.controller, &rig.trigger);
    feed_ramp(&rig.capture, &[4]);
    press(&mut rig.controller, &rig.trigger);

    rig.controller.shutdown();
    rig.controller.shutdown();
    assert_eq!(rig.controller.state(), LoopState::Idle);
    assert_eq!(rig.capture.counts().3, 1);
    assert_eq!(rig.playback.counts().3, 1);

    let playback = rig.playback.clone();
    press(&mut rig.controller, &rig.trigger);
    feed_ramp(&rig.capture, &[4]);
    press(&mut rig.controller, &rig.trigger);
    assert!(playback.is_running());

    drop(rig);
    assert!(!playback.is_open());
}
