//! Session settings applied when an engine is created.

/// Default tempo in BPM.
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Default master gain.
pub const DEFAULT_GAIN: f32 = 0.5;

/// Bar/beat grid that fixes the loop length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopConfig {
    pub beats_per_bar: u32,
    pub num_bars: u32,
}

impl LoopConfig {
    /// Beats in one pass of the loop.
    pub fn total_beats(&self) -> u32 {
        self.beats_per_bar * self.num_bars
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { beats_per_bar: 4, num_bars: 4 }
    }
}

/// Initial engine state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionConfig {
    pub tempo: f64,
    pub gain: f32,
    pub loop_config: LoopConfig,
    pub metronome: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            gain: DEFAULT_GAIN,
            loop_config: LoopConfig::default(),
            metronome: false,
        }
    }
}
