//! Note-to-frequency conversion for the oscillator voices.
//!
//! 12-TET tuning with A4 (MIDI note 69) at 440 Hz.

use core::f64::consts::TAU;

/// MIDI note number of the tuning reference.
const REFERENCE_NOTE: i32 = 69;

/// Frequency of the reference note in Hz.
const REFERENCE_HZ: f64 = 440.0;

/// Convert a MIDI note number to its frequency in Hz.
pub fn note_to_hz(note: u8) -> f64 {
    let semitones = note as i32 - REFERENCE_NOTE;
    REFERENCE_HZ * libm::exp2(semitones as f64 / 12.0)
}

/// Phase advance in radians per output sample for `note`.
///
/// Returns 0 for a non-positive sample rate, which leaves the voice silent.
pub fn note_to_increment(note: u8, sample_rate: f64) -> f64 {
    if sample_rate <= 0.0 || !sample_rate.is_finite() {
        return 0.0;
    }
    note_to_hz(note) / sample_rate * TAU
}
