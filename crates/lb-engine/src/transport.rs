//! Loop transport: the sample clock, loop length and record/play/idle state.

use lb_ir::TransportMode;

use crate::config::{LoopConfig, DEFAULT_TEMPO};

/// Loop length in samples for a tempo and bar grid.
///
/// Returns 0 for a degenerate tempo or sample rate.
pub fn loop_length_samples(tempo: f64, config: LoopConfig, sample_rate: f64) -> u64 {
    if !valid_rate(tempo) || !valid_rate(sample_rate) {
        return 0;
    }
    let seconds_per_beat = 60.0 / tempo;
    libm::round(seconds_per_beat * config.total_beats() as f64 * sample_rate) as u64
}

/// Samples in one beat, rounded. Returns 0 for a degenerate tempo or sample rate.
pub fn samples_per_beat(tempo: f64, sample_rate: f64) -> u64 {
    if !valid_rate(tempo) || !valid_rate(sample_rate) {
        return 0;
    }
    libm::round(sample_rate * 60.0 / tempo) as u64
}

fn valid_rate(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Single source of truth for loop timing and transport state.
#[derive(Clone, Debug)]
pub struct Transport {
    mode: TransportMode,
    metronome_on: bool,
    /// Loop-relative position, `< length` whenever `length > 0`.
    position: u64,
    length: u64,
    sample_rate: f64,
    tempo: f64,
    config: LoopConfig,
}

impl Transport {
    pub fn new(tempo: f64, config: LoopConfig, sample_rate: f64) -> Self {
        Self {
            mode: TransportMode::Idle,
            metronome_on: false,
            position: 0,
            length: loop_length_samples(tempo, config, sample_rate),
            sample_rate,
            tempo,
            config,
        }
    }

    /// Fix the sample rate for a new audio session and recompute the loop length.
    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.update_length();
    }

    /// Change tempo. Recorded positions are not rescaled; a position past
    /// the new loop end wraps to 0.
    pub fn set_tempo(&mut self, tempo: f64) {
        self.tempo = tempo;
        self.update_length();
    }

    fn update_length(&mut self) {
        self.length = loop_length_samples(self.tempo, self.config, self.sample_rate);
        if self.length > 0 && self.position >= self.length {
            self.position = 0;
        }
    }

    /// Advance the state machine one step: Idle → Recording → Playing → Idle.
    ///
    /// Entering Recording rewinds to the loop start. Stopping keeps the position.
    pub fn toggle(&mut self) -> TransportMode {
        self.mode = match self.mode {
            TransportMode::Idle => {
                self.position = 0;
                TransportMode::Recording
            }
            TransportMode::Recording => TransportMode::Playing,
            TransportMode::Playing => TransportMode::Idle,
        };
        self.mode
    }

    /// Stop and rewind.
    pub fn clear(&mut self) {
        self.mode = TransportMode::Idle;
        self.position = 0;
    }

    pub fn toggle_metronome(&mut self) -> bool {
        self.metronome_on = !self.metronome_on;
        self.metronome_on
    }

    pub fn set_metronome(&mut self, on: bool) {
        self.metronome_on = on;
    }

    /// Move the clock forward by one block while playing, wrapping to 0 at
    /// or past the loop end.
    pub fn advance(&mut self, num_samples: u64) {
        if !self.mode.is_playing() {
            return;
        }
        self.position += num_samples;
        if self.position >= self.length {
            self.position = 0;
        }
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn is_recording(&self) -> bool {
        self.mode.is_recording()
    }

    pub fn is_playing(&self) -> bool {
        self.mode.is_playing()
    }

    pub fn is_metronome_on(&self) -> bool {
        self.metronome_on
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn config(&self) -> LoopConfig {
        self.config
    }

    pub fn samples_per_beat(&self) -> u64 {
        samples_per_beat(self.tempo, self.sample_rate)
    }

    /// Position as a fraction of the loop, 0.0 for an empty loop.
    pub fn position_fraction(&self) -> f64 {
        if self.length == 0 {
            return 0.0;
        }
        self.position as f64 / self.length as f64
    }

    /// Beat within the loop, `None` when stopped or when the beat length is degenerate.
    pub fn current_beat(&self) -> Option<u32> {
        if !self.is_playing() {
            return None;
        }
        let spb = self.samples_per_beat();
        if spb == 0 {
            return None;
        }
        let beats = self.config.total_beats().max(1) as u64;
        Some(((self.position / spb) % beats) as u32)
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPO, LoopConfig::default(), 44100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> Transport {
        Transport::new(120.0, LoopConfig::default(), 44100.0)
    }

    #[test]
    fn loop_length_at_120_bpm() {
        assert_eq!(loop_length_samples(120.0, LoopConfig::default(), 44100.0), 352_800);
    }

    #[test]
    fn loop_length_rounds_instead_of_truncating() {
        // 60 / 133 * 16 * 44100 = 318_315.79
        let len = loop_length_samples(133.0, LoopConfig::default(), 44100.0);
        let exact: f64 = 60.0 / 133.0 * 16.0 * 44100.0;
        assert_eq!(len, exact.round() as u64);
        assert_eq!(len, 318_316);
    }

    #[test]
    fn loop_length_degenerate_inputs() {
        assert_eq!(loop_length_samples(0.0, LoopConfig::default(), 44100.0), 0);
        assert_eq!(loop_length_samples(-5.0, LoopConfig::default(), 44100.0), 0);
        assert_eq!(loop_length_samples(f64::NAN, LoopConfig::default(), 44100.0), 0);
        assert_eq!(loop_length_samples(120.0, LoopConfig::default(), 0.0), 0);
    }

    #[test]
    fn samples_per_beat_rounds() {
        assert_eq!(samples_per_beat(120.0, 44100.0), 22_050);
        assert_eq!(samples_per_beat(7.0, 1.0), 9);
        assert_eq!(samples_per_beat(0.0, 44100.0), 0);
    }

    #[test]
    fn set_tempo_and_prepare_agree() {
        let mut a = Transport::new(120.0, LoopConfig::default(), 48000.0);
        a.set_tempo(97.0);
        let mut b = Transport::new(97.0, LoopConfig::default(), 44100.0);
        b.prepare(48000.0);
        assert_eq!(a.length(), b.length());
        assert_eq!(a.length(), loop_length_samples(97.0, LoopConfig::default(), 48000.0));
    }

    #[test]
    fn toggle_cycles_record_play_stop_record() {
        let mut t = transport();
        assert_eq!(t.toggle(), TransportMode::Recording);
        assert_eq!(t.toggle(), TransportMode::Playing);
        assert_eq!(t.toggle(), TransportMode::Idle);
        assert_eq!(t.toggle(), TransportMode::Recording);
    }

    #[test]
    fn recording_rewinds_position() {
        let mut t = transport();
        t.toggle();
        t.advance(1000);
        t.toggle();
        t.toggle();
        assert_eq!(t.position(), 1000);
        t.toggle();
        assert_eq!(t.position(), 0);
    }

    #[test]
    fn shorter_loop_wraps_position_past_its_end() {
        let mut t = transport();
        t.toggle();
        t.advance(307_200);
        t.toggle();
        t.toggle();
        assert_eq!(t.mode(), TransportMode::Idle);
        t.set_tempo(200.0);
        assert_eq!(t.length(), 211_680);
        assert_eq!(t.position(), 0);
        assert!(t.position_fraction() < 1.0);
    }

    #[test]
    fn longer_loop_keeps_position() {
        let mut t = transport();
        t.toggle();
        t.advance(100_000);
        t.set_tempo(60.0);
        assert_eq!(t.position(), 100_000);
        t.advance(705_600 - 100_000);
        assert_eq!(t.position(), 0);
    }

    #[test]
    fn stop_keeps_position() {
        let mut t = transport();
        t.toggle();
        t.toggle();
        t.advance(512);
        t.toggle();
        assert_eq!(t.mode(), TransportMode::Idle);
        assert_eq!(t.position(), 512);
    }

    #[test]
    fn idle_does_not_advance() {
        let mut t = transport();
        t.advance(512);
        assert_eq!(t.position(), 0);
    }

    #[test]
    fn advance_wraps_to_zero_at_loop_end() {
        let mut t = transport();
        t.toggle();
        for _ in 0..(352_800 / 480) - 1 {
            t.advance(480);
        }
        assert_eq!(t.position(), 352_800 - 480);
        t.advance(480);
        assert_eq!(t.position(), 0);
    }

    #[test]
    fn advance_past_end_wraps_to_exact_zero() {
        let mut t = transport();
        t.toggle();
        t.advance(352_700);
        t.advance(512);
        assert_eq!(t.position(), 0);
    }

    #[test]
    fn clear_stops_and_rewinds() {
        let mut t = transport();
        t.toggle();
        t.advance(777);
        t.clear();
        assert_eq!(t.mode(), TransportMode::Idle);
        assert_eq!(t.position(), 0);
    }

    #[test]
    fn position_fraction() {
        let mut t = transport();
        t.toggle();
        t.advance(88_200);
        assert!((t.position_fraction() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn position_fraction_with_empty_loop_is_zero() {
        let mut t = transport();
        t.set_tempo(0.0);
        assert_eq!(t.length(), 0);
        assert_eq!(t.position_fraction(), 0.0);
    }

    #[test]
    fn current_beat_none_when_stopped() {
        assert_eq!(transport().current_beat(), None);
    }

    #[test]
    fn current_beat_counts_within_loop() {
        let mut t = transport();
        t.toggle();
        assert_eq!(t.current_beat(), Some(0));
        t.advance(22_050 * 5 + 10);
        assert_eq!(t.current_beat(), Some(5));
    }

    #[test]
    fn current_beat_none_for_degenerate_tempo() {
        let mut t = transport();
        t.toggle();
        t.set_tempo(0.0);
        assert_eq!(t.current_beat(), None);
    }

    #[test]
    fn metronome_flag_is_independent_of_transport() {
        let mut t = transport();
        assert!(t.toggle_metronome());
        t.toggle();
        t.clear();
        assert!(t.is_metronome_on());
        assert!(!t.toggle_metronome());
    }
}
