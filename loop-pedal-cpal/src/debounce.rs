//! Shift-register debounce for a raw, active-low pedal line (GPIO switch to ground).

use loop_pedal_core::traits::trigger_source::TriggerSource;

/// Raw line level: `true` while the line is high (pedal released).
pub trait LevelReader {
    fn read_level(&mut self) -> bool;
}

impl<F: FnMut() -> bool> LevelReader for F {
    fn read_level(&mut self) -> bool {
        self()
    }
}

/// [`TriggerSource`] reporting a press once the line has been high and then low for
/// eight consecutive polls.
///
/// Each poll shifts the sampled level into a 16-bit history whose top seven bits are
/// forced high. The history equals `0xff00` exactly once per press: one high sample
/// followed by eight low samples. Holding the pedal does not retrigger, and contact
/// bounce restarts the count.
pub struct DebouncedLevel<R: LevelReader> {
    reader: R,
    history: u16,
}

impl<R: LevelReader> DebouncedLevel<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, history: 0 }
    }
}

impl<R: LevelReader> TriggerSource for DebouncedLevel<R> {
    fn poll(&mut self) -> bool {
        let level = self.reader.read_level() as u16;
        self.history = (self.history << 1) | level | 0xfe00;
        self.history == 0xff00
    }
}
