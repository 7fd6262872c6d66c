//! Offline rendering of scripted performances.

use lb_engine::{loop_length_samples, samples_per_beat, Engine, EngineCommand, SessionConfig};
use lb_ir::{AudioBuffer, MidiBuffer, BLOCK_SIZE};

/// Channels of an offline render.
pub const RENDER_CHANNELS: u16 = 2;

/// A command applied at an absolute frame of an offline render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScriptedCommand {
    pub frame: u64,
    pub command: EngineCommand,
}

/// Time-ordered commands standing in for a player at the controls.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Performance {
    commands: Vec<ScriptedCommand>,
}

impl Performance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. Commands at the same frame apply in insertion order.
    pub fn at(mut self, frame: u64, command: EngineCommand) -> Self {
        let index = self.commands.partition_point(|c| c.frame <= frame);
        self.commands.insert(index, ScriptedCommand { frame, command });
        self
    }

    pub fn commands(&self) -> &[ScriptedCommand] {
        &self.commands
    }

    /// Record one arpeggiated pass over the whole loop, then keep looping it.
    ///
    /// Recording starts at frame 0 and switches to playback exactly one loop
    /// length later. Each beat plays the next note of a C major arpeggio for
    /// half a beat.
    pub fn demo(config: &SessionConfig, sample_rate: u32) -> Self {
        const PHRASE: [u8; 8] = [60, 64, 67, 72, 76, 72, 67, 64];

        let sample_rate = sample_rate as f64;
        let beat = samples_per_beat(config.tempo, sample_rate);
        let length = loop_length_samples(config.tempo, config.loop_config, sample_rate);

        let mut performance = Self::new().at(0, EngineCommand::ToggleTransport);
        if !config.metronome {
            performance = performance.at(0, EngineCommand::ToggleMetronome);
        }

        for i in 0..config.loop_config.total_beats() as u64 {
            let note = PHRASE[i as usize % PHRASE.len()];
            let start = i * beat;
            performance = performance
                .at(start, EngineCommand::NoteOn { note, velocity: 1.0 })
                .at(start + beat / 2, EngineCommand::NoteOff { note });
        }

        performance.at(length, EngineCommand::ToggleTransport)
    }
}

/// Render `frames` frames of interleaved stereo through a fresh engine,
/// applying each scripted command at its frame.
pub fn render(config: SessionConfig, performance: &Performance, sample_rate: u32, frames: u64) -> Vec<f32> {
    let mut engine = Engine::new(config);
    engine.prepare(sample_rate as f64, BLOCK_SIZE);

    let channels = RENDER_CHANNELS as usize;
    let mut samples = vec![0.0f32; frames as usize * channels];
    let mut buffer = AudioBuffer::new(RENDER_CHANNELS, BLOCK_SIZE);
    let mut midi = MidiBuffer::new();
    let mut pending = performance.commands().iter().peekable();
    let mut frame = 0u64;

    while frame < frames {
        while let Some(scripted) = pending.next_if(|c| c.frame <= frame) {
            engine.handle_command(scripted.command);
        }

        // Stop the block at the next command so it lands on its exact frame.
        let mut end = (frame + BLOCK_SIZE as u64).min(frames);
        if let Some(next) = pending.peek() {
            end = end.min(next.frame);
        }
        let len = (end - frame) as usize;

        buffer.set_frames(len);
        midi.clear();
        engine.process(&mut midi, &mut buffer);

        let start = frame as usize * channels;
        buffer.write_interleaved(&mut samples[start..start + len * channels], channels);
        frame = end;
    }

    samples
}
