//! Host adapters for loopbox: cpal audio output, midir MIDI input and the
//! block runner that drives the engine from the audio callback.

mod cpal_backend;
mod midi_input;
mod runner;
mod traits;

pub use cpal_backend::CpalOutput;
pub use midi_input::{list_ports, MidiInputError, MidiInputHandle};
pub use runner::BlockRunner;
pub use traits::{AudioError, AudioOutput};
