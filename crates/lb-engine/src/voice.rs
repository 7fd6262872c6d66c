//! Voice: one sine oscillator rendering a single held or releasing note.

use core::f64::consts::TAU;

use lb_ir::AudioBuffer;

use crate::frequency::note_to_increment;

/// Velocity-to-level scale, leaving room for several voices to sum.
pub const HEADROOM: f64 = 0.25;

/// Per-sample multiplier applied to the release factor.
pub const TAIL_OFF_RATIO: f64 = 0.9995;

/// Release factor at or below which the voice is freed.
pub const TAIL_OFF_FLOOR: f64 = 0.005;

/// Voice lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceState {
    /// Not sounding; available for allocation.
    #[default]
    Free,
    /// Note-on received, key still down.
    Held,
    /// Note-off received; tail-off running.
    Releasing,
}

/// A single sine voice.
#[derive(Clone, Copy, Debug, Default)]
pub struct Voice {
    /// Current oscillator phase in radians, kept in `[0, TAU)`.
    pub angle: f64,
    /// Phase advance per sample in radians.
    pub increment: f64,
    /// Peak amplitude.
    pub level: f64,
    /// Release factor; 0 means not releasing.
    pub tail_off: f64,
    /// Sounding note, `None` when free.
    pub note: Option<u8>,
    /// MIDI channel the note arrived on.
    pub channel: u8,
    /// Allocation order, used to pick the longest-held voice when stealing.
    pub serial: u64,
}

impl Voice {
    /// Start a note from silence.
    pub fn start(&mut self, note: u8, velocity: f32, channel: u8, sample_rate: f64, serial: u64) {
        self.angle = 0.0;
        self.level = velocity as f64 * HEADROOM;
        self.tail_off = 0.0;
        self.increment = note_to_increment(note, sample_rate);
        self.note = Some(note);
        self.channel = channel;
        self.serial = serial;
    }

    /// Release the note, either with tail-off or immediately.
    ///
    /// Re-arming tail-off on a voice that is already releasing does nothing.
    pub fn stop(&mut self, allow_tail_off: bool) {
        if allow_tail_off && self.increment != 0.0 {
            if self.tail_off == 0.0 {
                self.tail_off = 1.0;
            }
        } else {
            self.clear();
        }
    }

    /// Free the voice without rendering any further samples.
    pub fn clear(&mut self) {
        self.note = None;
        self.increment = 0.0;
        self.tail_off = 0.0;
    }

    pub fn state(&self) -> VoiceState {
        match self.note {
            None => VoiceState::Free,
            Some(_) if self.tail_off > 0.0 => VoiceState::Releasing,
            Some(_) => VoiceState::Held,
        }
    }

    pub fn is_free(&self) -> bool {
        self.note.is_none()
    }

    /// Add `num_samples` frames starting at `start` into every channel of `output`.
    ///
    /// When the release factor crosses the floor the voice is freed and the
    /// rest of the span stays untouched.
    pub fn render(&mut self, output: &mut AudioBuffer, start: usize, num_samples: usize) {
        if self.note.is_none() || self.increment == 0.0 {
            return;
        }

        for frame in start..start + num_samples {
            let mut sample = libm::sin(self.angle) * self.level;

            if self.tail_off > 0.0 {
                sample *= self.tail_off;
                self.tail_off *= TAIL_OFF_RATIO;

                if self.tail_off <= TAIL_OFF_FLOOR {
                    self.clear();
                    break;
                }
            }

            output.add_to_all(frame, sample as f32);

            self.angle += self.increment;
            if self.angle >= TAU {
                self.angle -= TAU;
            }
        }
    }
}
