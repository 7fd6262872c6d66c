//! Core data types for the loopbox looper synth.
//!
//! Audio buffers, block-relative MIDI events and recorded loop notes shared
//! by the engine, the host adapters and the controller.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod event;
mod note;
mod transport;

pub use audio_buffer::{AudioBuffer, BLOCK_SIZE, MAX_CHANNELS};
pub use event::{MidiBuffer, MidiEvent, MidiMessage, MAX_BLOCK_EVENTS};
pub use note::RecordedNote;
pub use transport::TransportMode;
