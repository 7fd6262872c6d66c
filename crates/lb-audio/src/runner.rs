//! Adapter between a host's interleaved audio callback and the engine.

use std::sync::Arc;

use lb_engine::{Engine, EngineCommand, SharedStatus};
use lb_ir::{AudioBuffer, MidiBuffer, MidiMessage, MAX_BLOCK_EVENTS, MAX_CHANNELS};
use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

/// Owns the engine on the audio thread.
///
/// Every host callback drains pending commands and live MIDI, renders the
/// requested frames in chunks no longer than the engine's prepared block
/// size and publishes a status snapshot. Nothing here allocates after
/// construction.
pub struct BlockRunner {
    engine: Engine,
    commands: HeapCons<EngineCommand>,
    midi_in: HeapCons<MidiMessage>,
    status: Arc<SharedStatus>,
    buffer: AudioBuffer,
    midi: MidiBuffer,
}

impl BlockRunner {
    /// Wrap a prepared engine. The scratch buffer is sized from
    /// [`Engine::max_block_size`] and `channels` (capped at `MAX_CHANNELS`).
    pub fn new(
        engine: Engine,
        commands: HeapCons<EngineCommand>,
        midi_in: HeapCons<MidiMessage>,
        status: Arc<SharedStatus>,
        channels: u16,
    ) -> Self {
        let channels = channels.clamp(1, MAX_CHANNELS);
        let buffer = AudioBuffer::new(channels, engine.max_block_size().max(1));
        status.publish(&engine.status());

        Self {
            engine,
            commands,
            midi_in,
            status,
            buffer,
            midi: MidiBuffer::new(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Fill one interleaved host buffer with `channels` samples per frame.
    pub fn run(&mut self, data: &mut [f32], channels: usize) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.run_inner(data, channels));
        #[cfg(not(feature = "alloc_check"))]
        self.run_inner(data, channels);
    }

    fn run_inner(&mut self, data: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }

        while let Some(command) = self.commands.try_pop() {
            self.engine.handle_command(command);
        }

        // Live input lands at the start of the first chunk. Anything that
        // does not fit stays queued for the next callback.
        self.midi.clear();
        while self.midi.len() < MAX_BLOCK_EVENTS {
            match self.midi_in.try_pop() {
                Some(message) => {
                    self.midi.add_event(0, message);
                }
                None => break,
            }
        }

        let chunk_len = self.buffer.capacity() * channels;
        for chunk in data.chunks_mut(chunk_len) {
            self.buffer.set_frames(chunk.len() / channels);
            self.engine.process(&mut self.midi, &mut self.buffer);
            self.buffer.write_interleaved(chunk, channels);
            self.midi.clear();
        }

        self.status.publish(&self.engine.status());
    }
}
