//! # loop-pedal-cpal
//!
//! Hardware backend for loop-pedal.
//!
//! Provides:
//! - `CpalPort`: capture, playback, and duplex audio ports on the default cpal host
//! - `DeviceEnumerator`: input/output device listing
//! - `KeyboardTrigger`: stdin trigger (Enter presses, `q` quits)
//! - `DebouncedLevel`: shift-register debounce for a raw active-low pedal line
//!
//! ## Usage
//! ```ignore
//! use loop_pedal_cpal::{CpalPort, KeyboardTrigger};
//! use loop_pedal_core::{LoopController, PedalConfiguration, Ports};
//!
//! let running = Arc::new(AtomicBool::new(true));
//! let trigger = KeyboardTrigger::spawn(running.clone())?;
//! let mut pedal = LoopController::new(Ports::Duplex(CpalPort::default_device()), trigger, PedalConfiguration::default())?;
//! pedal.run(&running)?;
//! ```

pub mod cpal_port;
pub mod debounce;
pub mod device_enumerator;
pub mod keyboard_trigger;

pub use cpal_port::CpalPort;
pub use debounce::{DebouncedLevel, LevelReader};
pub use device_enumerator::DeviceEnumerator;
pub use keyboard_trigger::KeyboardTrigger;
