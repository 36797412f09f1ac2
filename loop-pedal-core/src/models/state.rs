use std::fmt;

/// Loop pedal state machine.
///
/// State transitions (one trigger edge per arrow, no terminal state):
/// ```text
/// idle → recording → looping
///   ↑                   │
///   └───────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoopState {
    #[default]
    Idle,
    Recording,
    Looping,
}

impl LoopState {
    /// The state a trigger edge moves to.
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::Recording,
            Self::Recording => Self::Looping,
            Self::Looping => Self::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_looping(&self) -> bool {
        matches!(self, Self::Looping)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Looping => "looping",
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
