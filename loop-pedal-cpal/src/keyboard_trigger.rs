//! Keyboard trigger: each line read from stdin is one press.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use loop_pedal_core::models::error::LoopError;
use loop_pedal_core::traits::trigger_source::TriggerSource;

/// [`TriggerSource`] fed by a background line reader.
///
/// Enter presses the pedal. A line of `q` (or end of input) clears the shared `running`
/// flag so the control loop can exit. Presses that arrive between two polls collapse into a
/// single edge.
pub struct KeyboardTrigger {
    pending: Arc<AtomicBool>,
}

impl KeyboardTrigger {
    /// Read presses from stdin.
    pub fn spawn(running: Arc<AtomicBool>) -> Result<Self, LoopError> {
        Self::from_reader(io::BufReader::new(io::stdin()), running)
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R, running: Arc<AtomicBool>) -> Result<Self, LoopError> {
        let pending = Arc::new(AtomicBool::new(false));
        let edge = Arc::clone(&pending);

        thread::Builder::new()
            .name("keyboard-trigger".into())
            .spawn(move || {
                for line in reader.lines() {
                    let Ok(line) = line else {
                        break;
                    };
                    if line.trim().eq_ignore_ascii_case("q") {
                        log::info!("Quit requested");
                        break;
                    }
                    edge.store(true, Ordering::SeqCst);
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| LoopError::ConfigurationFailed(format!("failed to spawn keyboard thread: {}", e)))?;

        Ok(Self { pending })
    }
}

impl TriggerSource for KeyboardTrigger {
    fn poll(&mut self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}
