//! Control messages sent from the presentation thread to the audio thread.

/// One user action. Applied by the audio thread at the start of a block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineCommand {
    /// Idle → Recording → Playing → Idle.
    ToggleTransport,
    /// Stop and discard all recorded notes.
    Clear,
    ToggleMetronome,
    SetTempo(f64),
    SetGain(f32),
    /// On-screen keyboard key down (channel 1).
    NoteOn { note: u8, velocity: f32 },
    /// On-screen keyboard key up (channel 1).
    NoteOff { note: u8 },
}
