use loop_pedal_core::{CaptureDiagnostics, LoopDelegate, LoopError, LoopState, TakeSummary};

/// LoopDelegate that reports controller events through the log.
pub struct LogDelegate;

impl LoopDelegate for LogDelegate {
    fn on_state_changed(&self, state: LoopState) {
        let hint = match state {
            LoopState::Idle => "press Enter to record, q to quit",
            LoopState::Recording => "press Enter to start looping",
            LoopState::Looping => "press Enter to stop",
        };
        log::info!("[{}] {}", state, hint);
    }

    fn on_take_frozen(&self, take: &TakeSummary) {
        log::info!(
            "Take {}: {} frames ({:.2}s at {} Hz, {} ch){}",
            take.id,
            take.frames,
            take.duration_secs,
            take.format.sample_rate,
            take.format.channels,
            match &take.persisted {
                Some(p) => format!(", saved to {}", p.file_path.display()),
                None => String::new(),
            }
        );
        if take.dropped_frames > 0 {
            log::warn!("Take {} lost {} frames", take.id, take.dropped_frames);
        }
    }

    fn on_error(&self, error: &LoopError) {
        log::error!("Pedal stopped: {} (exit code {})", error, error.exit_code());
    }
}

/// Serializable diagnostics snapshot, logged when the session ends.
pub fn diagnostics_json(d: &CaptureDiagnostics) -> serde_json::Value {
    serde_json::json!({
        "captureCallbacks": d.capture_callbacks,
        "playbackCallbacks": d.playback_callbacks,
        "framesCaptured": d.frames_captured,
        "framesDropped": d.frames_dropped,
        "framesRendered": d.frames_rendered,
        "contendedCallbacks": d.contended_callbacks,
    })
}
