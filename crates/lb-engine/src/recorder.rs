//! Recorder: turns live note-on/note-off pairs into loop-relative notes.

use heapless::Vec;
use lb_ir::{MidiBuffer, MidiMessage, RecordedNote};

/// Capacity of the recorded sequence across all overdub passes.
pub const MAX_RECORDED_NOTES: usize = 1024;

/// Velocity stored for every recorded note; the played velocity is not kept.
pub const RECORDED_VELOCITY: f32 = 0.8;

/// Recorded sequence plus the notes currently held during a pass.
#[derive(Clone, Debug)]
pub struct Recorder {
    notes: Vec<RecordedNote, MAX_RECORDED_NOTES>,
    /// Loop-relative start of each held note, indexed by note number.
    active_starts: [Option<u64>; 128],
    dropped: u32,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            notes: Vec::new(),
            active_starts: [None; 128],
            dropped: 0,
        }
    }

    /// Consume one block of live input.
    ///
    /// `position` is the loop position at the block start. A note-on
    /// overwrites any unmatched start for the same note; a note-off without
    /// a start is ignored. Completed notes are appended, never replacing
    /// earlier passes.
    pub fn record_block(&mut self, midi: &MidiBuffer, position: u64, loop_length: u64) {
        if loop_length == 0 {
            return;
        }

        for event in midi.iter() {
            let sample = (position + event.offset as u64) % loop_length;

            match event.message {
                MidiMessage::NoteOn { note, .. } => {
                    if let Some(slot) = self.active_starts.get_mut(note as usize) {
                        *slot = Some(sample);
                    }
                }
                MidiMessage::NoteOff { note, .. } => {
                    let start = self.active_starts.get_mut(note as usize).and_then(Option::take);
                    if let Some(start_sample) = start {
                        let recorded = RecordedNote {
                            note,
                            velocity: RECORDED_VELOCITY,
                            start_sample,
                            end_sample: sample,
                        };
                        if self.notes.push(recorded).is_err() {
                            self.dropped += 1;
                        }
                    }
                }
                MidiMessage::Other { .. } => {}
            }
        }
    }

    /// Forget held notes without touching the recorded sequence.
    pub fn clear_active(&mut self) {
        self.active_starts = [None; 128];
    }

    /// Discard everything.
    pub fn clear(&mut self) {
        self.notes.clear();
        self.clear_active();
    }

    pub fn notes(&self) -> &[RecordedNote] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Number of held notes awaiting their note-off.
    pub fn held_count(&self) -> usize {
        self.active_starts.iter().filter(|s| s.is_some()).count()
    }

    /// Completed notes lost because the sequence was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}
