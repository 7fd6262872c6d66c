//! Metronome: click events on beat boundaries of the loop clock.

use lb_ir::{MidiBuffer, MidiMessage};

/// Pitch of the click on the first beat of each bar.
pub const ACCENT_NOTE: u8 = 84;

/// Pitch of every other click.
pub const REGULAR_NOTE: u8 = 72;

/// Channel the clicks are sent on.
pub const CLICK_CHANNEL: u8 = 10;

/// Click velocity.
pub const CLICK_VELOCITY: f32 = 0.7;

/// Samples between a click's note-on and its note-off, independent of tempo.
pub const CLICK_LENGTH: u32 = 1000;

/// Beat-boundary detector. Keeps the last clicked beat across blocks.
#[derive(Clone, Debug, Default)]
pub struct Metronome {
    last_beat: Option<u64>,
}

impl Metronome {
    pub fn new() -> Self {
        Self { last_beat: None }
    }

    /// Forget the last beat so the next block clicks at its first sample.
    pub fn reset(&mut self) {
        self.last_beat = None;
    }

    pub fn last_beat(&self) -> Option<u64> {
        self.last_beat
    }

    /// Emit a click for every beat index that starts inside the block.
    ///
    /// Each click's note-off is placed `CLICK_LENGTH` samples later and may
    /// land past the end of the block; the caller keeps such events for the
    /// following block. Returns the number of events that did not fit.
    pub fn generate(
        &mut self,
        position: u64,
        num_samples: u32,
        samples_per_beat: u64,
        beats_per_bar: u32,
        midi: &mut MidiBuffer,
    ) -> u32 {
        if samples_per_beat == 0 {
            return 0;
        }

        let beats_per_bar = beats_per_bar.max(1) as u64;
        let mut dropped = 0;
        let mut i: u64 = 0;

        while i < num_samples as u64 {
            let beat = (position + i) / samples_per_beat;

            if self.last_beat != Some(beat) {
                self.last_beat = Some(beat);
                let note = if beat % beats_per_bar == 0 { ACCENT_NOTE } else { REGULAR_NOTE };
                let offset = i as u32;

                if !midi.add_event(offset, MidiMessage::note_on(CLICK_CHANNEL, note, CLICK_VELOCITY)) {
                    dropped += 1;
                }
                if !midi.add_event(offset + CLICK_LENGTH, MidiMessage::note_off(CLICK_CHANNEL, note)) {
                    dropped += 1;
                }
            }

            // Jump to the next beat boundary.
            i = (beat + 1) * samples_per_beat - position;
        }

        dropped
    }
}
