//! Transport mode shared between the engine and its observers.

/// Looper state machine.
///
/// `Recording` also counts as playing: previously recorded content keeps
/// looping while a new pass is overdubbed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportMode {
    #[default]
    Idle,
    Recording,
    Playing,
}

impl TransportMode {
    pub fn is_recording(self) -> bool {
        self == TransportMode::Recording
    }

    pub fn is_playing(self) -> bool {
        matches!(self, TransportMode::Recording | TransportMode::Playing)
    }

    /// Compact encoding for publishing through an atomic.
    pub fn to_u8(self) -> u8 {
        match self {
            TransportMode::Idle => 0,
            TransportMode::Recording => 1,
            TransportMode::Playing => 2,
        }
    }

    /// Inverse of [`TransportMode::to_u8`]; unknown values read as `Idle`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => TransportMode::Recording,
            2 => TransportMode::Playing,
            _ => TransportMode::Idle,
        }
    }
}
