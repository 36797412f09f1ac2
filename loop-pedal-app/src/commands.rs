use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use loop_pedal_core::{LoopController, LoopError, PedalConfiguration, Ports, PortWiring};
use loop_pedal_cpal::{CpalPort, DeviceEnumerator, KeyboardTrigger};

use crate::delegate::{diagnostics_json, LogDelegate};

/// Load the configuration file, or defaults when no path is given.
pub fn load_configuration(path: Option<&Path>) -> Result<PedalConfiguration, LoopError> {
    let config = match path {
        Some(path) => {
            let json = fs::read_to_string(path).map_err(|e| {
                LoopError::ConfigurationFailed(format!("failed to read {}: {}", path.display(), e))
            })?;
            serde_json::from_str::<PedalConfiguration>(&json).map_err(|e| {
                LoopError::ConfigurationFailed(format!("failed to parse {}: {}", path.display(), e))
            })?
        }
        None => PedalConfiguration::default(),
    };
    config.validate().map_err(LoopError::ConfigurationFailed)?;
    Ok(config)
}

pub fn build_ports(config: &PedalConfiguration) -> Ports<CpalPort> {
    let capture = config.capture_device.clone();
    let playback = config.playback_device.clone();
    match config.wiring {
        PortWiring::Duplex => Ports::Duplex(CpalPort::with_devices(capture, playback)),
        PortWiring::Split => Ports::Split {
            capture: CpalPort::with_devices(capture, None),
            playback: CpalPort::with_devices(None, playback),
        },
    }
}

pub fn list_devices() {
    DeviceEnumerator::new().log_devices();
}

/// Run the pedal until the user quits.
pub fn run_pedal(config: PedalConfiguration) -> Result<(), LoopError> {
    log::info!(
        "Loop pedal: {} Hz, {} ch, {:?} wiring, {:?}",
        config.sample_rate,
        config.channels,
        config.wiring,
        config.persistence
    );

    let running = Arc::new(AtomicBool::new(true));
    let trigger = KeyboardTrigger::spawn(Arc::clone(&running))?;
    let ports = build_ports(&config);

    let mut pedal = LoopController::new(ports, trigger, config)?;
    pedal.set_delegate(Arc::new(LogDelegate));

    let result = pedal.run(&running);
    log::info!("Session diagnostics: {}", diagnostics_json(&pedal.diagnostics()));
    result
}
