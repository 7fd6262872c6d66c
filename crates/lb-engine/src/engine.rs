//! Block pipeline: recorder, loop playback, metronome and the two synths.

use lb_ir::{AudioBuffer, MidiBuffer, MidiMessage, RecordedNote, TransportMode, BLOCK_SIZE};

use crate::command::EngineCommand;
use crate::config::SessionConfig;
use crate::metronome::Metronome;
use crate::recorder::Recorder;
use crate::scheduler::schedule_block;
use crate::status::EngineStatus;
use crate::transport::Transport;
use crate::voice_pool::{VoicePool, MAIN_VOICES, METRONOME_VOICES};

/// Level of the metronome relative to the instrument.
pub const METRONOME_MIX: f32 = 0.3;

/// Channel the on-screen keyboard plays on.
pub const KEYBOARD_CHANNEL: u8 = 1;

/// The looper synth engine.
///
/// Everything the audio thread touches is sized in [`Engine::new`] or
/// [`Engine::prepare`]; [`Engine::process`] and the control methods never
/// allocate.
pub struct Engine {
    transport: Transport,
    recorder: Recorder,
    metronome: Metronome,
    /// Instrument voices: live input plus loop playback.
    synth: VoicePool<MAIN_VOICES>,
    /// Click voices, rendered separately and mixed in at `METRONOME_MIX`.
    click_synth: VoicePool<METRONOME_VOICES>,
    /// Click events; note-offs past a block end wait here for a later block.
    click_midi: MidiBuffer,
    /// Pending on-screen keyboard events, merged at offset 0 of the next block.
    keyboard: MidiBuffer,
    /// Mono click scratch, mixed into every output channel.
    click_buffer: AudioBuffer,
    gain: f32,
    max_block_size: usize,
    dropped_events: u32,
}

impl Engine {
    /// Create an engine at 44.1 kHz with `BLOCK_SIZE` frames. Call
    /// [`Engine::prepare`] before the first block of a real session.
    pub fn new(config: SessionConfig) -> Self {
        let sample_rate = 44100.0;
        let mut transport = Transport::new(config.tempo, config.loop_config, sample_rate);
        transport.set_metronome(config.metronome);

        Self {
            transport,
            recorder: Recorder::new(),
            metronome: Metronome::new(),
            synth: VoicePool::new(sample_rate),
            click_synth: VoicePool::new(sample_rate),
            click_midi: MidiBuffer::new(),
            keyboard: MidiBuffer::new(),
            click_buffer: AudioBuffer::new(1, BLOCK_SIZE),
            gain: config.gain,
            max_block_size: BLOCK_SIZE,
            dropped_events: 0,
        }
    }

    /// Fix sample rate and largest block for an audio session.
    ///
    /// Allocates; call from the control side before audio starts.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        self.transport.prepare(sample_rate);
        self.synth.set_sample_rate(sample_rate);
        self.click_synth.set_sample_rate(sample_rate);
        self.click_buffer = AudioBuffer::new(1, max_block_size);
        self.max_block_size = max_block_size;
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    // --- Control surface ---

    /// Apply a control message.
    pub fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::ToggleTransport => {
                self.toggle_transport();
            }
            EngineCommand::Clear => self.clear(),
            EngineCommand::ToggleMetronome => {
                self.toggle_metronome();
            }
            EngineCommand::SetTempo(bpm) => self.set_tempo(bpm),
            EngineCommand::SetGain(gain) => self.set_gain(gain),
            EngineCommand::NoteOn { note, velocity } => {
                self.queue_keyboard(MidiMessage::note_on(KEYBOARD_CHANNEL, note, velocity));
            }
            EngineCommand::NoteOff { note } => {
                self.queue_keyboard(MidiMessage::note_off(KEYBOARD_CHANNEL, note));
            }
        }
    }

    fn queue_keyboard(&mut self, message: MidiMessage) {
        if !self.keyboard.add_event(0, message) {
            self.dropped_events += 1;
        }
    }

    /// Record → Play → Stop → Record. Returns the new mode.
    ///
    /// Entering Recording rewinds the loop and forgets half-recorded notes,
    /// keeping everything already recorded. Stopping releases the instrument.
    pub fn toggle_transport(&mut self) -> TransportMode {
        let mode = self.transport.toggle();
        match mode {
            TransportMode::Recording => {
                self.recorder.clear_active();
                self.metronome.reset();
            }
            TransportMode::Idle => self.synth.all_notes_off(true),
            TransportMode::Playing => {}
        }
        mode
    }

    /// Stop, rewind and discard all recorded notes.
    pub fn clear(&mut self) {
        self.transport.clear();
        self.recorder.clear();
        self.metronome.reset();
        self.synth.all_notes_off(true);
    }

    pub fn toggle_metronome(&mut self) -> bool {
        self.transport.toggle_metronome()
    }

    /// Change tempo; the loop length follows immediately.
    pub fn set_tempo(&mut self, bpm: f64) {
        self.transport.set_tempo(bpm);
    }

    /// Master gain, applied as a plain multiply on the next block.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    // --- Queries ---

    pub fn is_recording(&self) -> bool {
        self.transport.is_recording()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn is_metronome_on(&self) -> bool {
        self.transport.is_metronome_on()
    }

    pub fn loop_position_fraction(&self) -> f64 {
        self.transport.position_fraction()
    }

    pub fn current_beat_index(&self) -> Option<u32> {
        self.transport.current_beat()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn recorded_notes(&self) -> &[RecordedNote] {
        self.recorder.notes()
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn active_voices(&self) -> usize {
        self.synth.active_count()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            mode: self.transport.mode(),
            metronome_on: self.transport.is_metronome_on(),
            position: self.transport.position(),
            loop_length: self.transport.length(),
            beat: self.transport.current_beat(),
            beats_per_bar: self.transport.config().beats_per_bar,
            tempo: self.transport.tempo(),
            gain: self.gain,
            recorded_notes: self.recorder.len() as u32,
            dropped_events: self.dropped_events + self.recorder.dropped(),
        }
    }

    // --- Audio ---

    /// Render one block in place.
    ///
    /// `midi` holds the live input for this block and receives the replayed
    /// loop notes. `output` is overwritten; every channel carries the same
    /// signal. A block longer than the prepared maximum renders silence and
    /// leaves the transport untouched.
    pub fn process(&mut self, midi: &mut MidiBuffer, output: &mut AudioBuffer) {
        output.silence();

        let num_samples = output.frames();
        if num_samples == 0 || num_samples > self.click_buffer.capacity() {
            return;
        }
        let block_len = num_samples as u32;

        for event in self.keyboard.iter() {
            if !midi.add_event(event.offset, event.message) {
                self.dropped_events += 1;
            }
        }
        self.keyboard.clear();

        let position = self.transport.position();
        let loop_length = self.transport.length();

        if self.transport.is_recording() {
            self.recorder.record_block(midi, position, loop_length);
        }

        if self.transport.is_playing() {
            self.dropped_events += schedule_block(self.recorder.notes(), position, block_len, midi);

            if self.transport.is_metronome_on() {
                self.dropped_events += self.metronome.generate(
                    position,
                    block_len,
                    self.transport.samples_per_beat(),
                    self.transport.config().beats_per_bar,
                    &mut self.click_midi,
                );
            }
        }

        self.synth.render_block(output, midi);

        self.click_buffer.set_frames(num_samples);
        self.click_buffer.silence();
        self.click_synth.render_block(&mut self.click_buffer, &self.click_midi);
        self.click_midi.advance(block_len);
        output.mix_channel_to_all(&self.click_buffer, 0, METRONOME_MIX);

        output.apply_gain(self.gain);

        self.transport.advance(num_samples as u64);
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metronome::{ACCENT_NOTE, CLICK_LENGTH};

    const SR: f64 = 44100.0;
    const BLOCK: usize = 480;

    fn engine() -> Engine {
        let mut e = Engine::default();
        e.prepare(SR, BLOCK);
        e
    }

    fn run(engine: &mut Engine, midi: &mut MidiBuffer) -> AudioBuffer {
        let mut out = AudioBuffer::new(2, BLOCK);
        engine.process(midi, &mut out);
        out
    }

    fn silent_block(engine: &mut Engine) -> AudioBuffer {
        run(engine, &mut MidiBuffer::new())
    }

    #[test]
    fn idle_engine_is_silent() {
        let mut e = engine();
        let out = silent_block(&mut e);
        assert_eq!(out.peak(), 0.0);
        assert_eq!(e.transport().position(), 0);
    }

    #[test]
    fn live_note_sounds_while_idle() {
        let mut e = engine();
        let mut midi = MidiBuffer::new();
        midi.add_event(0, MidiMessage::note_on(1, 69, 1.0));
        let out = run(&mut e, &mut midi);
        assert!(out.peak() > 0.0);
        assert!(e.recorded_notes().is_empty());
    }

    #[test]
    fn output_overwrites_previous_contents() {
        let mut e = engine();
        let mut out = AudioBuffer::new(2, BLOCK);
        out.channel_mut(0).fill(1.0);
        e.process(&mut MidiBuffer::new(), &mut out);
        assert_eq!(out.peak(), 0.0);
    }

    #[test]
    fn gain_scales_output() {
        let render = |gain: f32| {
            let mut e = engine();
            e.set_gain(gain);
            let mut midi = MidiBuffer::new();
            midi.add_event(0, MidiMessage::note_on(1, 69, 1.0));
            run(&mut e, &mut midi).peak()
        };
        let full = render(1.0);
        let half = render(0.5);
        assert!(full > 0.2);
        assert!((half - full * 0.5).abs() < 1e-6);
    }

    #[test]
    fn keyboard_commands_are_recorded() {
        let mut e = engine();
        e.toggle_transport();
        e.handle_command(EngineCommand::NoteOn { note: 60, velocity: 1.0 });
        silent_block(&mut e);
        e.handle_command(EngineCommand::NoteOff { note: 60 });
        silent_block(&mut e);
        assert_eq!(e.recorded_notes().len(), 1);
        assert_eq!(e.recorded_notes()[0].start_sample, 0);
        assert_eq!(e.recorded_notes()[0].end_sample, BLOCK as u64);
    }

    #[test]
    fn transport_advances_only_while_playing() {
        let mut e = engine();
        silent_block(&mut e);
        assert_eq!(e.transport().position(), 0);
        e.toggle_transport();
        silent_block(&mut e);
        assert_eq!(e.transport().position(), BLOCK as u64);
    }

    #[test]
    fn commands_map_to_control_operations() {
        let mut e = engine();
        e.handle_command(EngineCommand::ToggleTransport);
        assert!(e.is_recording());
        assert!(e.is_playing());
        e.handle_command(EngineCommand::ToggleMetronome);
        assert!(e.is_metronome_on());
        e.handle_command(EngineCommand::SetTempo(60.0));
        assert_eq!(e.transport().length(), 705_600);
        e.handle_command(EngineCommand::SetGain(0.25));
        assert_eq!(e.gain(), 0.25);
        e.handle_command(EngineCommand::Clear);
        assert!(!e.is_playing());
    }

    #[test]
    fn stop_releases_held_loop_notes() {
        let mut e = engine();
        e.toggle_transport();
        let mut midi = MidiBuffer::new();
        midi.add_event(0, MidiMessage::note_on(1, 60, 1.0));
        run(&mut e, &mut midi);
        assert_eq!(e.active_voices(), 1);
        e.toggle_transport();
        e.toggle_transport();
        for _ in 0..40 {
            silent_block(&mut e);
        }
        assert_eq!(e.active_voices(), 0);
    }

    #[test]
    fn metronome_clicks_only_while_playing() {
        let mut e = engine();
        e.toggle_metronome();
        assert_eq!(silent_block(&mut e).peak(), 0.0);
        e.toggle_transport();
        assert!(silent_block(&mut e).peak() > 0.0);
    }

    #[test]
    fn click_note_off_is_delivered_in_a_later_block() {
        let mut e = engine();
        e.toggle_metronome();
        e.toggle_transport();
        silent_block(&mut e);
        let pending: Vec<_> = e.click_midi.iter().copied().collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].offset, CLICK_LENGTH - BLOCK as u32);
        assert_eq!(pending[0].message, MidiMessage::note_off(10, ACCENT_NOTE));

        silent_block(&mut e);
        silent_block(&mut e);
        assert!(e.click_midi.is_empty());
    }

    #[test]
    fn metronome_is_attenuated() {
        let mut e = engine();
        e.set_gain(1.0);
        e.toggle_metronome();
        e.toggle_transport();
        let peak = silent_block(&mut e).peak();
        // Click level 0.7 * 0.25 through the 0.3 mix.
        assert!(peak <= 0.7 * 0.25 * METRONOME_MIX + 1e-6);
        assert!(peak > 0.7 * 0.25 * METRONOME_MIX * 0.9);
    }

    #[test]
    fn oversized_block_renders_silence_without_advancing() {
        let mut e = engine();
        e.toggle_transport();
        let mut midi = MidiBuffer::new();
        midi.add_event(0, MidiMessage::note_on(1, 60, 1.0));
        let mut out = AudioBuffer::new(2, BLOCK * 2);
        e.process(&mut midi, &mut out);
        assert_eq!(out.peak(), 0.0);
        assert_eq!(e.transport().position(), 0);
    }

    #[test]
    fn degenerate_tempo_degrades_to_idle_timing() {
        let mut e = engine();
        e.set_tempo(0.0);
        e.toggle_metronome();
        e.toggle_transport();
        let mut midi = MidiBuffer::new();
        midi.add_event(0, MidiMessage::note_on(1, 60, 1.0));
        midi.add_event(10, MidiMessage::note_off(1, 60));
        run(&mut e, &mut midi);
        assert!(e.recorded_notes().is_empty());
        assert_eq!(e.transport().position(), 0);
        assert_eq!(e.loop_position_fraction(), 0.0);
        assert_eq!(e.current_beat_index(), None);
    }

    #[test]
    fn status_reflects_engine() {
        let mut e = engine();
        e.toggle_transport();
        silent_block(&mut e);
        let s = e.status();
        assert_eq!(s.mode, TransportMode::Recording);
        assert_eq!(s.position, BLOCK as u64);
        assert_eq!(s.loop_length, 352_800);
        assert_eq!(s.beat, Some(0));
        assert_eq!(s.tempo, 120.0);
        assert_eq!(s.gain, 0.5);
    }

    #[test]
    fn tempo_change_keeps_notes_and_moves_wrap_point() {
        let mut e = engine();
        e.toggle_transport();
        e.handle_command(EngineCommand::NoteOn { note: 60, velocity: 1.0 });
        silent_block(&mut e);
        e.handle_command(EngineCommand::NoteOff { note: 60 });
        silent_block(&mut e);
        let recorded = e.recorded_notes()[0];

        e.set_tempo(90.0);
        assert_eq!(e.recorded_notes()[0], recorded);
        assert_eq!((recorded.start_sample, recorded.end_sample), (0, BLOCK as u64));

        let length = e.transport().length();
        assert_eq!(length, 470_400);
        let mut blocks = 2;
        while (blocks + 1) * BLOCK as u64 <= length {
            silent_block(&mut e);
            blocks += 1;
        }
        // 470_400 is exactly 980 blocks of 480.
        assert_eq!(e.transport().position(), 0);
    }

    #[test]
    fn faster_tempo_wraps_position_beyond_new_loop() {
        let mut e = engine();
        e.toggle_transport();
        for _ in 0..640 {
            silent_block(&mut e);
        }
        e.toggle_transport();
        e.toggle_transport();
        assert_eq!(e.transport().position(), 307_200);

        e.set_tempo(200.0);
        assert_eq!(e.transport().length(), 211_680);
        assert_eq!(e.transport().position(), 0);
        assert!(e.loop_position_fraction() < 1.0);
        assert_eq!(e.status().position, 0);
    }

    #[test]
    fn click_reaches_every_output_channel() {
        let mut e = engine();
        e.toggle_metronome();
        e.toggle_transport();
        let mut out = AudioBuffer::new(4, BLOCK);
        e.process(&mut MidiBuffer::new(), &mut out);
        assert!(out.channel(3).iter().any(|s| *s != 0.0));
        for ch in 1..4 {
            assert_eq!(out.channel(ch), out.channel(0));
        }
    }
}
