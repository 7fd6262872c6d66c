//! Status snapshot published by the audio thread for presentation.

use core::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, AtomicU8, Ordering};

use lb_ir::TransportMode;

/// Read-only view of the engine after a block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineStatus {
    pub mode: TransportMode,
    pub metronome_on: bool,
    pub position: u64,
    pub loop_length: u64,
    /// Beat within the loop, `None` when stopped.
    pub beat: Option<u32>,
    pub beats_per_bar: u32,
    pub tempo: f64,
    pub gain: f32,
    pub recorded_notes: u32,
    /// Events and notes lost to full fixed-capacity buffers since start.
    pub dropped_events: u32,
}

impl EngineStatus {
    pub fn is_recording(&self) -> bool {
        self.mode.is_recording()
    }

    pub fn is_playing(&self) -> bool {
        self.mode.is_playing()
    }

    /// Loop position in `[0, 1)`, 0.0 for an empty loop.
    pub fn position_fraction(&self) -> f64 {
        if self.loop_length == 0 {
            return 0.0;
        }
        self.position as f64 / self.loop_length as f64
    }

    /// 1-based (bar, beat-in-bar) for display, `None` when stopped.
    pub fn bar_and_beat(&self) -> Option<(u32, u32)> {
        let beat = self.beat?;
        let per_bar = self.beats_per_bar.max(1);
        Some((beat / per_bar + 1, beat % per_bar + 1))
    }
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self {
            mode: TransportMode::Idle,
            metronome_on: false,
            position: 0,
            loop_length: 0,
            beat: None,
            beats_per_bar: 4,
            tempo: 0.0,
            gain: 0.0,
            recorded_notes: 0,
            dropped_events: 0,
        }
    }
}

/// Lock-free home for the latest [`EngineStatus`].
///
/// One writer (the audio thread) stores every field after each block; any
/// number of readers may take snapshots. Fields are independent, so a
/// snapshot taken mid-publish can mix two blocks.
#[derive(Debug, Default)]
pub struct SharedStatus {
    mode: AtomicU8,
    metronome_on: AtomicBool,
    position: AtomicU64,
    loop_length: AtomicU64,
    beat: AtomicI64,
    beats_per_bar: AtomicU32,
    tempo_bits: AtomicU64,
    gain_bits: AtomicU32,
    recorded_notes: AtomicU32,
    dropped_events: AtomicU32,
}

impl SharedStatus {
    pub fn new(initial: &EngineStatus) -> Self {
        let shared = Self::default();
        shared.publish(initial);
        shared
    }

    pub fn publish(&self, status: &EngineStatus) {
        self.mode.store(status.mode.to_u8(), Ordering::Relaxed);
        self.metronome_on.store(status.metronome_on, Ordering::Relaxed);
        self.position.store(status.position, Ordering::Relaxed);
        self.loop_length.store(status.loop_length, Ordering::Relaxed);
        self.beat.store(status.beat.map_or(-1, i64::from), Ordering::Relaxed);
        self.beats_per_bar.store(status.beats_per_bar, Ordering::Relaxed);
        self.tempo_bits.store(status.tempo.to_bits(), Ordering::Relaxed);
        self.gain_bits.store(status.gain.to_bits(), Ordering::Relaxed);
        self.recorded_notes.store(status.recorded_notes, Ordering::Relaxed);
        self.dropped_events.store(status.dropped_events, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineStatus {
        let beat = self.beat.load(Ordering::Relaxed);
        EngineStatus {
            mode: TransportMode::from_u8(self.mode.load(Ordering::Relaxed)),
            metronome_on: self.metronome_on.load(Ordering::Relaxed),
            position: self.position.load(Ordering::Relaxed),
            loop_length: self.loop_length.load(Ordering::Relaxed),
            beat: u32::try_from(beat).ok(),
            beats_per_bar: self.beats_per_bar.load(Ordering::Relaxed),
            tempo: f64::from_bits(self.tempo_bits.load(Ordering::Relaxed)),
            gain: f32::from_bits(self.gain_bits.load(Ordering::Relaxed)),
            recorded_notes: self.recorded_notes.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
        }
    }
}
