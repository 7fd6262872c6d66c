//! Notes captured by the looper.

/// A completed note, positioned in loop-relative samples.
///
/// `end_sample` may be smaller than `start_sample` when the note was held
/// across the loop boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordedNote {
    pub note: u8,
    pub velocity: f32,
    pub start_sample: u64,
    pub end_sample: u64,
}

impl RecordedNote {
    /// Whether the note was released after the loop wrapped.
    pub fn wraps(&self) -> bool {
        self.end_sample < self.start_sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_only_when_end_precedes_start() {
        let plain = RecordedNote { note: 60, velocity: 0.8, start_sample: 100, end_sample: 44200 };
        let wrapped = RecordedNote { note: 60, velocity: 0.8, start_sample: 352000, end_sample: 300 };
        assert!(!plain.wraps());
        assert!(wrapped.wraps());
    }
}
