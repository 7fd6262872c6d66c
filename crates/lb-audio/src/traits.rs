//! Audio output trait and error types.

use thiserror::Error;

/// Error type for audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("no audio output device available")]
    NoDevice,
    #[error("audio stream already built")]
    AlreadyRunning,
}

/// Trait for audio output backends.
pub trait AudioOutput {
    /// Device sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Interleaved channel count of the device stream.
    fn channels(&self) -> u16;

    /// Resume the stream.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Pause the stream; the device outputs silence.
    fn stop(&mut self) -> Result<(), AudioError>;
}
