//! VoicePool: fixed-size voice allocation, note dispatch and mixing.

use lb_ir::{AudioBuffer, MidiBuffer, MidiMessage};

use crate::voice::{Voice, VoiceState};

/// Identifier for a voice slot in the pool.
pub type VoiceId = usize;

/// Voices available to the played and looped instrument.
pub const MAIN_VOICES: usize = 16;

/// Voices available to the metronome click.
pub const METRONOME_VOICES: usize = 2;

/// A fixed pool of `N` sine voices.
///
/// The pool never grows; when every slot is busy a note-on steals one
/// (priority: quietest releasing voice, then the longest-held voice).
#[derive(Clone, Debug)]
pub struct VoicePool<const N: usize> {
    voices: [Voice; N],
    sample_rate: f64,
    next_serial: u64,
}

impl<const N: usize> VoicePool<N> {
    /// Create a pool of free voices.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            voices: [Voice::default(); N],
            sample_rate,
            next_serial: 0,
        }
    }

    /// Change the rate used for notes started from now on.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    /// Start a note, returning the slot it landed in.
    ///
    /// A voice already sounding the same note on the same channel is
    /// released with tail-off first.
    pub fn note_on(&mut self, channel: u8, note: u8, velocity: f32) -> VoiceId {
        for voice in &mut self.voices {
            if voice.note == Some(note) && voice.channel == channel {
                voice.stop(true);
            }
        }

        let id = self.allocate();
        let serial = self.next_serial;
        self.next_serial += 1;
        self.voices[id].start(note, velocity, channel, self.sample_rate, serial);
        id
    }

    /// Release every voice sounding `note` on `channel`, with tail-off.
    pub fn note_off(&mut self, channel: u8, note: u8) {
        for voice in &mut self.voices {
            if voice.note == Some(note) && voice.channel == channel {
                voice.stop(true);
            }
        }
    }

    /// Release every voice.
    pub fn all_notes_off(&mut self, allow_tail_off: bool) {
        for voice in &mut self.voices {
            if !voice.is_free() {
                voice.stop(allow_tail_off);
            }
        }
    }

    /// Apply one event. Non-note messages are ignored.
    pub fn handle_message(&mut self, message: &MidiMessage) {
        match *message {
            MidiMessage::NoteOn { channel, note, velocity } => {
                self.note_on(channel, note, velocity);
            }
            MidiMessage::NoteOff { channel, note } => self.note_off(channel, note),
            MidiMessage::Other { .. } => {}
        }
    }

    fn allocate(&self) -> VoiceId {
        if let Some(id) = self.voices.iter().position(|v| v.is_free()) {
            return id;
        }
        self.find_steal_candidate()
    }

    /// Quietest releasing voice if any, otherwise the oldest note.
    fn find_steal_candidate(&self) -> VoiceId {
        let releasing = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.state() == VoiceState::Releasing)
            .min_by(|(_, a), (_, b)| a.tail_off.total_cmp(&b.tail_off))
            .map(|(i, _)| i);

        releasing.unwrap_or_else(|| {
            self.voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.serial)
                .map(|(i, _)| i)
                .unwrap_or(0)
        })
    }

    /// Get a reference to a voice.
    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(id)
    }

    /// Count of sounding voices.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_free()).count()
    }

    /// Render all sounding voices into a span of the output buffer.
    pub fn render_all(&mut self, output: &mut AudioBuffer, start: usize, num_samples: usize) {
        for voice in &mut self.voices {
            voice.render(output, start, num_samples);
        }
    }

    /// Render the whole active region of `output`, applying each event of
    /// `midi` at its offset. Events at or past the block end are left alone.
    pub fn render_block(&mut self, output: &mut AudioBuffer, midi: &MidiBuffer) {
        let num_samples = output.frames();
        let mut pos = 0;

        for event in midi.within(num_samples as u32) {
            let offset = event.offset as usize;
            if offset > pos {
                self.render_all(output, pos, offset - pos);
                pos = offset;
            }
            self.handle_message(&event.message);
        }

        if pos < num_samples {
            self.render_all(output, pos, num_samples - pos);
        }
    }
}
