//! Real-time engine for the loopbox looper.
//!
//! Records live notes into a fixed-length loop, replays them on every pass,
//! clicks a metronome and renders everything through a polyphonic sine synth.

#![cfg_attr(not(feature = "std"), no_std)]

mod command;
mod config;
mod engine;
mod frequency;
mod metronome;
mod recorder;
mod scheduler;
mod status;
mod transport;
mod voice;
mod voice_pool;

pub use command::EngineCommand;
pub use config::{LoopConfig, SessionConfig, DEFAULT_GAIN, DEFAULT_TEMPO};
pub use engine::{Engine, KEYBOARD_CHANNEL, METRONOME_MIX};
pub use frequency::{note_to_hz, note_to_increment};
pub use metronome::{Metronome, ACCENT_NOTE, CLICK_CHANNEL, CLICK_LENGTH, CLICK_VELOCITY, REGULAR_NOTE};
pub use recorder::{Recorder, MAX_RECORDED_NOTES, RECORDED_VELOCITY};
pub use scheduler::{schedule_block, PLAYBACK_CHANNEL};
pub use status::{EngineStatus, SharedStatus};
pub use transport::{loop_length_samples, samples_per_beat, Transport};
pub use voice::{Voice, VoiceState};
pub use voice_pool::{VoiceId, VoicePool, MAIN_VOICES, METRONOME_VOICES};
