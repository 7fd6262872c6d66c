//! Multichannel f32 audio buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// Maximum number of audio channels per buffer.
pub const MAX_CHANNELS: u16 = 8;

/// Default block size for audio processing.
pub const BLOCK_SIZE: usize = 512;

/// A multichannel f32 audio buffer in planar layout.
///
/// Storage is sized once for `capacity` frames per channel. The active frame
/// count can then be changed per block with [`AudioBuffer::set_frames`]
/// without touching the allocator.
/// `data[ch * capacity + frame]` gives the sample for channel `ch` at `frame`.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: u16,
    capacity: usize,
    frames: usize,
}

impl AudioBuffer {
    /// Create a new silent buffer with the given dimensions.
    pub fn new(channels: u16, frames: usize) -> Self {
        Self {
            data: vec![0.0; channels as usize * frames],
            channels,
            capacity: frames,
            frames,
        }
    }

    /// Fill the active region of every channel with zero.
    pub fn silence(&mut self) {
        for ch in 0..self.channels {
            self.channel_mut(ch).fill(0.0);
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of active frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Number of frames the storage was sized for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the active frame count, clamped to the capacity.
    pub fn set_frames(&mut self, frames: usize) {
        self.frames = frames.min(self.capacity);
    }

    /// Read-only access to one channel's sample data.
    pub fn channel(&self, ch: u16) -> &[f32] {
        let start = ch as usize * self.capacity;
        &self.data[start..start + self.frames]
    }

    /// Mutable access to one channel's sample data.
    pub fn channel_mut(&mut self, ch: u16) -> &mut [f32] {
        let start = ch as usize * self.capacity;
        let len = self.frames;
        &mut self.data[start..start + len]
    }

    /// Add `value` to every channel at `frame`.
    pub fn add_to_all(&mut self, frame: usize, value: f32) {
        if frame >= self.frames {
            return;
        }
        for ch in 0..self.channels as usize {
            self.data[ch * self.capacity + frame] += value;
        }
    }

    /// Add channel `source_ch` of `source`, scaled by `gain`, into every
    /// channel of this buffer.
    pub fn mix_channel_to_all(&mut self, source: &AudioBuffer, source_ch: u16, gain: f32) {
        if source_ch >= source.channels {
            return;
        }
        let src = source.channel(source_ch);
        let frs = self.frames.min(src.len());
        for ch in 0..self.channels {
            let dst = self.channel_mut(ch);
            for i in 0..frs {
                dst[i] += src[i] * gain;
            }
        }
    }

    /// Scale all active samples by `gain`.
    pub fn apply_gain(&mut self, gain: f32) {
        for ch in 0..self.channels {
            for s in self.channel_mut(ch) {
                *s *= gain;
            }
        }
    }

    /// Peak absolute sample value over the active region.
    pub fn peak(&self) -> f32 {
        (0..self.channels)
            .flat_map(|ch| self.channel(ch).iter())
            .fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// Write the active region into an interleaved slice.
    ///
    /// `out` holds `out_channels` samples per frame. Extra output channels are
    /// zero-filled; extra buffer channels are dropped.
    pub fn write_interleaved(&self, out: &mut [f32], out_channels: usize) {
        if out_channels == 0 {
            return;
        }
        for (frame, chunk) in out.chunks_mut(out_channels).take(self.frames).enumerate() {
            for (ch, sample) in chunk.iter_mut().enumerate() {
                *sample = if ch < self.channels as usize {
                    self.data[ch * self.capacity + frame]
                } else {
                    0.0
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_channel_to_all_fans_out_mono_source() {
        let mut mono = AudioBuffer::new(1, 4);
        mono.channel_mut(0).copy_from_slice(&[1.0, 0.5, 0.0, -1.0]);
        let mut out = AudioBuffer::new(3, 4);
        out.mix_channel_to_all(&mono, 0, 0.5);
        for ch in 0..3 {
            assert_eq!(out.channel(ch), &[0.5, 0.25, 0.0, -0.5]);
        }
        out.mix_channel_to_all(&mono, 1, 1.0);
        assert_eq!(out.channel(0), &[0.5, 0.25, 0.0, -0.5]);
    }

    #[test]
    fn new_is_silent() {
        let buf = AudioBuffer::new(2, 4);
        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.frames(), 4);
        assert!(buf.channel(0).iter().all(|&s| s == 0.0));
        assert!(buf.channel(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn channel_mut_writes_correctly() {
        let mut buf = AudioBuffer::new(2, 2);
        buf.channel_mut(0)[0] = 1.0;
        buf.channel_mut(1)[1] = -0.5;
        assert_eq!(buf.channel(0), &[1.0, 0.0]);
        assert_eq!(buf.channel(1), &[0.0, -0.5]);
    }

    #[test]
    fn set_frames_keeps_channel_planes_apart() {
        let mut buf = AudioBuffer::new(2, 8);
        buf.set_frames(3);
        buf.channel_mut(1)[0] = 0.25;
        assert_eq!(buf.channel(0), &[0.0, 0.0, 0.0]);
        assert_eq!(buf.channel(1), &[0.25, 0.0, 0.0]);
    }

    #[test]
    fn set_frames_clamps_to_capacity() {
        let mut buf = AudioBuffer::new(1, 4);
        buf.set_frames(100);
        assert_eq!(buf.frames(), 4);
    }

    #[test]
    fn add_to_all_duplicates_across_channels() {
        let mut buf = AudioBuffer::new(2, 2);
        buf.add_to_all(1, 0.5);
        buf.add_to_all(1, 0.25);
        assert_eq!(buf.channel(0), &[0.0, 0.75]);
        assert_eq!(buf.channel(1), &[0.0, 0.75]);
    }

    #[test]
    fn add_to_all_ignores_frames_past_end() {
        let mut buf = AudioBuffer::new(1, 4);
        buf.set_frames(2);
        buf.add_to_all(3, 1.0);
        buf.set_frames(4);
        assert_eq!(buf.channel(0)[3], 0.0);
    }

    #[test]
    fn silence_clears_data() {
        let mut buf = AudioBuffer::new(1, 2);
        buf.channel_mut(0)[0] = 1.0;
        buf.silence();
        assert_eq!(buf.channel(0), &[0.0, 0.0]);
    }

    #[test]
    fn mix_into_shorter_block_uses_minimum() {
        let mut dst = AudioBuffer::new(2, 2);
        let mut src = AudioBuffer::new(1, 4);
        src.channel_mut(0).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);

        dst.mix_channel_to_all(&src, 0, 1.0);
        assert_eq!(dst.channel(0), &[1.0, 2.0]);
        assert_eq!(dst.channel(1), &[1.0, 2.0]);
    }

    #[test]
    fn apply_gain_scales_all() {
        let mut buf = AudioBuffer::new(2, 1);
        buf.channel_mut(0)[0] = 1.0;
        buf.channel_mut(1)[0] = -0.5;
        buf.apply_gain(2.0);
        assert!((buf.channel(0)[0] - 2.0).abs() < 1e-6);
        assert!((buf.channel(1)[0] - -1.0).abs() < 1e-6);
    }

    #[test]
    fn peak_finds_largest_magnitude() {
        let mut buf = AudioBuffer::new(2, 2);
        buf.channel_mut(0)[1] = 0.4;
        buf.channel_mut(1)[0] = -0.6;
        assert!((buf.peak() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn write_interleaved_pads_extra_channels() {
        let mut buf = AudioBuffer::new(2, 2);
        buf.channel_mut(0).copy_from_slice(&[0.1, 0.2]);
        buf.channel_mut(1).copy_from_slice(&[0.3, 0.4]);
        let mut out = [9.0f32; 6];
        buf.write_interleaved(&mut out, 3);
        assert_eq!(out, [0.1, 0.3, 0.0, 0.2, 0.4, 0.0]);
    }
}
