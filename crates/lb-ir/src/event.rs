//! MIDI-like events with sample-accurate offsets inside a block.

use arrayvec::ArrayVec;

/// Maximum number of events one block's stream can hold.
pub const MAX_BLOCK_EVENTS: usize = 512;

/// A decoded channel message.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MidiMessage {
    /// Start a note. `velocity` is normalised to 0.0-1.0.
    NoteOn { channel: u8, note: u8, velocity: f32 },
    /// Release a note.
    NoteOff { channel: u8, note: u8 },
    /// Anything else (controllers, pitch bend, clock...). Carried, never acted on.
    Other { status: u8, data1: u8, data2: u8 },
}

impl MidiMessage {
    /// Note-on with a 1-based channel number.
    pub fn note_on(channel: u8, note: u8, velocity: f32) -> Self {
        Self::NoteOn { channel, note: note & 0x7F, velocity: velocity.clamp(0.0, 1.0) }
    }

    /// Note-off with a 1-based channel number.
    pub fn note_off(channel: u8, note: u8) -> Self {
        Self::NoteOff { channel, note: note & 0x7F }
    }

    /// Decode raw MIDI bytes. A note-on with velocity 0 decodes as a note-off.
    ///
    /// Returns `None` for empty input and system real-time/common messages.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let status = *bytes.first()?;
        if status < 0x80 || status >= 0xF0 {
            return None;
        }
        let channel = (status & 0x0F) + 1;
        let data1 = bytes.get(1).copied().unwrap_or(0) & 0x7F;
        let data2 = bytes.get(2).copied().unwrap_or(0) & 0x7F;
        Some(match status & 0xF0 {
            0x90 if data2 > 0 => Self::NoteOn { channel, note: data1, velocity: data2 as f32 / 127.0 },
            0x90 | 0x80 => Self::NoteOff { channel, note: data1 },
            _ => Self::Other { status, data1, data2 },
        })
    }
}

/// A message placed at a frame offset within the current block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MidiEvent {
    pub offset: u32,
    pub message: MidiMessage,
}

/// Fixed-capacity event stream for one block, ordered by offset.
///
/// Events sharing an offset keep their insertion order. Nothing here
/// allocates, so the stream can be filled from the audio thread.
#[derive(Clone, Debug, Default)]
pub struct MidiBuffer {
    events: ArrayVec<MidiEvent, MAX_BLOCK_EVENTS>,
}

impl MidiBuffer {
    pub fn new() -> Self {
        Self { events: ArrayVec::new() }
    }

    /// Insert an event. Returns `false` (and drops it) when the buffer is full.
    pub fn add_event(&mut self, offset: u32, message: MidiMessage) -> bool {
        let pos = self.events.partition_point(|e| e.offset <= offset);
        self.events.try_insert(pos, MidiEvent { offset, message }).is_ok()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MidiEvent> {
        self.events.iter()
    }

    /// Events whose offset lies before `num_samples`.
    pub fn within(&self, num_samples: u32) -> impl Iterator<Item = &MidiEvent> {
        self.events.iter().take_while(move |e| e.offset < num_samples)
    }

    /// Drop the events of an elapsed block and shift the rest so they land
    /// at the right offset in the next one.
    pub fn advance(&mut self, num_samples: u32) {
        self.events.retain(|e| e.offset >= num_samples);
        for e in self.events.iter_mut() {
            e.offset -= num_samples;
        }
    }
}
