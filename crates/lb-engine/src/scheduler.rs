//! Loop playback: injects recorded notes that fall inside the current block.

use lb_ir::{MidiBuffer, MidiMessage, RecordedNote};

/// MIDI channel replayed notes are sent on.
pub const PLAYBACK_CHANNEL: u8 = 1;

/// Inject note-ons and note-offs for every recorded note whose start or end
/// lies in `[position, position + num_samples)`.
///
/// Start and end are tested independently, so a note's on and off usually
/// land in different blocks. A note whose end wrapped below its start is not
/// treated specially: its off fires early in the next pass and its on late
/// in the current one. This is a linear scan over every recorded note.
///
/// Returns the number of events that did not fit in `midi`.
pub fn schedule_block(notes: &[RecordedNote], position: u64, num_samples: u32, midi: &mut MidiBuffer) -> u32 {
    let block_start = position;
    let block_end = position + num_samples as u64;
    let in_block = |sample: u64| sample >= block_start && sample < block_end;
    let mut dropped = 0;

    for note in notes {
        if in_block(note.start_sample) {
            let offset = (note.start_sample - block_start) as u32;
            if !midi.add_event(offset, MidiMessage::note_on(PLAYBACK_CHANNEL, note.note, note.velocity)) {
                dropped += 1;
            }
        }

        if in_block(note.end_sample) {
            let offset = (note.end_sample - block_start) as u32;
            if !midi.add_event(offset, MidiMessage::note_off(PLAYBACK_CHANNEL, note.note)) {
                dropped += 1;
            }
        }
    }

    dropped
}
