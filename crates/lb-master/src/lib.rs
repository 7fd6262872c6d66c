//! Headless controller for loopbox.
//!
//! Owns the control side of an engine session: queues commands for the
//! audio thread, clamps parameters, reads the published status and renders
//! performances offline. The CLI is a thin shell around it.

mod offline;
mod wav;

use std::sync::Arc;

use lb_audio::{AudioError, AudioOutput, BlockRunner, CpalOutput, MidiInputError, MidiInputHandle};
use lb_engine::{Engine, EngineCommand};
use lb_ir::{MidiMessage, BLOCK_SIZE};
use ringbuf::traits::{Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use thiserror::Error;
use tracing::{debug, info, warn};

// Re-export common types so callers don't need lb-ir/lb-engine directly.
pub use lb_engine::{EngineStatus, LoopConfig, SessionConfig, SharedStatus, DEFAULT_GAIN, DEFAULT_TEMPO};
pub use lb_audio::list_ports as list_midi_ports;
pub use lb_ir::TransportMode;

pub use offline::{render, Performance, ScriptedCommand, RENDER_CHANNELS};
pub use wav::{samples_to_wav, write_wav};

/// Lowest tempo accepted from the control surface.
pub const MIN_TEMPO: f64 = 60.0;

/// Highest tempo accepted from the control surface.
pub const MAX_TEMPO: f64 = 200.0;

const COMMAND_QUEUE: usize = 256;
const MIDI_QUEUE: usize = 1024;

/// Error type for controller operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Midi(#[from] MidiInputError),
    #[error("audio is already running")]
    AudioRunning,
    #[error("MIDI input is already connected")]
    MidiConnected,
    #[error("command queue is full")]
    QueueFull,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Engine state owned by the controller until audio starts.
struct Pending {
    engine: Engine,
    commands: HeapCons<EngineCommand>,
    midi: HeapCons<MidiMessage>,
}

/// Headless looper controller.
///
/// Before [`Controller::start_audio`] the engine lives here and controls are
/// applied to it directly. Afterwards it belongs to the audio thread and
/// controls travel through a lock-free queue, taking effect at the start of
/// the next block.
pub struct Controller {
    config: SessionConfig,
    commands: HeapProd<EngineCommand>,
    midi_producer: Option<HeapProd<MidiMessage>>,
    status: Arc<SharedStatus>,
    pending: Option<Pending>,
    output: Option<CpalOutput>,
    midi_input: Option<MidiInputHandle>,
}

impl Controller {
    pub fn new(config: SessionConfig) -> Self {
        let config = SessionConfig {
            tempo: clamp_tempo(config.tempo),
            gain: clamp_gain(config.gain),
            ..config
        };

        let engine = Engine::new(config);
        let status = Arc::new(SharedStatus::new(&engine.status()));
        let (commands, command_cons) = HeapRb::<EngineCommand>::new(COMMAND_QUEUE).split();
        let (midi_producer, midi_cons) = HeapRb::<MidiMessage>::new(MIDI_QUEUE).split();

        Self {
            config,
            commands,
            midi_producer: Some(midi_producer),
            status,
            pending: Some(Pending { engine, commands: command_cons, midi: midi_cons }),
            output: None,
            midi_input: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // --- Live audio ---

    /// Open the default output device and hand the engine to its callback.
    pub fn start_audio(&mut self) -> Result<(), ControllerError> {
        let Some(pending) = self.pending.take() else {
            return Err(ControllerError::AudioRunning);
        };

        let mut output = match CpalOutput::new() {
            Ok(output) => output,
            Err(e) => {
                self.pending = Some(pending);
                return Err(e.into());
            }
        };

        let Pending { mut engine, commands, midi } = pending;
        let channels = output.channels();
        engine.prepare(output.sample_rate() as f64, BLOCK_SIZE);

        let runner = BlockRunner::new(engine, commands, midi, self.status.clone(), channels);
        output.build_stream(runner)?;

        info!(
            sample_rate = output.sample_rate(),
            channels,
            block = BLOCK_SIZE,
            "Audio started."
        );
        self.output = Some(output);
        Ok(())
    }

    pub fn is_audio_running(&self) -> bool {
        self.output.is_some()
    }

    /// Connect a hardware MIDI input. `port` selects the first port whose
    /// name contains it; `None` takes the first port. Returns the port name.
    pub fn connect_midi(&mut self, port: Option<&str>) -> Result<String, ControllerError> {
        let Some(producer) = self.midi_producer.take() else {
            return Err(ControllerError::MidiConnected);
        };

        match MidiInputHandle::connect(port, producer) {
            Ok(handle) => {
                let name = handle.port_name().to_string();
                self.midi_input = Some(handle);
                Ok(name)
            }
            Err(e) => {
                // The producer moved into the failed connect; a fresh queue
                // is only possible before audio takes the consumer.
                if let Some(pending) = self.pending.as_mut() {
                    let (producer, consumer) = HeapRb::<MidiMessage>::new(MIDI_QUEUE).split();
                    pending.midi = consumer;
                    self.midi_producer = Some(producer);
                }
                Err(e.into())
            }
        }
    }

    // --- Controls ---

    pub fn toggle_transport(&mut self) -> Result<(), ControllerError> {
        info!("Toggle transport.");
        self.send(EngineCommand::ToggleTransport)
    }

    pub fn clear(&mut self) -> Result<(), ControllerError> {
        info!("Clear loop.");
        self.send(EngineCommand::Clear)
    }

    pub fn toggle_metronome(&mut self) -> Result<(), ControllerError> {
        self.send(EngineCommand::ToggleMetronome)
    }

    /// Set the tempo, clamped to [`MIN_TEMPO`, `MAX_TEMPO`]. Returns the
    /// applied value.
    pub fn set_tempo(&mut self, bpm: f64) -> Result<f64, ControllerError> {
        let bpm = clamp_tempo(bpm);
        info!(bpm, "Set tempo.");
        self.send(EngineCommand::SetTempo(bpm))?;
        self.config.tempo = bpm;
        Ok(bpm)
    }

    /// Set the master gain, clamped to [0, 1]. Returns the applied value.
    pub fn set_gain(&mut self, gain: f32) -> Result<f32, ControllerError> {
        let gain = clamp_gain(gain);
        debug!(gain, "Set gain.");
        self.send(EngineCommand::SetGain(gain))?;
        self.config.gain = gain;
        Ok(gain)
    }

    /// On-screen keyboard key down.
    pub fn note_on(&mut self, note: u8, velocity: f32) -> Result<(), ControllerError> {
        let velocity = if velocity.is_finite() { velocity.clamp(0.0, 1.0) } else { 0.0 };
        self.send(EngineCommand::NoteOn { note: note.min(127), velocity })
    }

    /// On-screen keyboard key up.
    pub fn note_off(&mut self, note: u8) -> Result<(), ControllerError> {
        self.send(EngineCommand::NoteOff { note: note.min(127) })
    }

    fn send(&mut self, command: EngineCommand) -> Result<(), ControllerError> {
        if let Some(pending) = self.pending.as_mut() {
            pending.engine.handle_command(command);
            self.status.publish(&pending.engine.status());
            return Ok(());
        }

        self.commands.try_push(command).map_err(|_| {
            warn!(?command, "Command queue full, dropping command.");
            ControllerError::QueueFull
        })
    }

    // --- Status ---

    /// Latest status published by the engine.
    pub fn status(&self) -> EngineStatus {
        self.status.snapshot()
    }

    pub fn is_recording(&self) -> bool {
        self.status().is_recording()
    }

    pub fn is_playing(&self) -> bool {
        self.status().is_playing()
    }

    pub fn is_metronome_on(&self) -> bool {
        self.status().metronome_on
    }

    pub fn loop_position_fraction(&self) -> f64 {
        self.status().position_fraction()
    }

    pub fn current_beat_index(&self) -> Option<u32> {
        self.status().beat
    }

    /// `Bar B - Beat N` while playing, `Beat: -` otherwise.
    pub fn beat_display(&self) -> String {
        format_beat(&self.status())
    }

    // --- Offline rendering ---

    /// Render the built-in demo performance with this session's settings.
    pub fn render_demo(&self, sample_rate: u32, seconds: f64) -> Vec<f32> {
        let performance = Performance::demo(&self.config, sample_rate);
        let frames = (seconds.max(0.0) * sample_rate as f64) as u64;
        offline::render(self.config, &performance, sample_rate, frames)
    }

    /// Render the demo performance and encode it as a WAV file image.
    pub fn render_demo_to_wav(&self, sample_rate: u32, seconds: f64) -> Vec<u8> {
        let samples = self.render_demo(sample_rate, seconds);
        wav::samples_to_wav(&samples, RENDER_CHANNELS, sample_rate)
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

/// Human-readable bar and beat for a status snapshot.
pub fn format_beat(status: &EngineStatus) -> String {
    match status.bar_and_beat() {
        Some((bar, beat)) => format!("Bar {bar} - Beat {beat}"),
        None => "Beat: -".to_string(),
    }
}

fn clamp_tempo(bpm: f64) -> f64 {
    if bpm.is_nan() {
        return DEFAULT_TEMPO;
    }
    bpm.clamp(MIN_TEMPO, MAX_TEMPO)
}

fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        return DEFAULT_GAIN;
    }
    gain.clamp(0.0, 1.0)
}
