//! Frame cursor: index / percent / time → frame index
//!
//! Percent lookups wrap out-of-range input by its fractional part
//! (`-0.2 → 0.8`, `1.3 → 0.3`) and clamp the result to the last frame.
//! Index lookups (`wrap_index`) wrap by modulo instead, so asking for
//! `frame_count` lands on frame 0 while percent 1.0 lands on the last frame.

/// Stateless mapping over a frame count and rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCursor {
    pub frame_count: usize,
    pub frame_rate: f64,
}

impl FrameCursor {
    pub fn new(frame_count: usize, frame_rate: f64) -> Self {
        Self { frame_count, frame_rate }
    }

    /// Sequence duration at the current rate
    pub fn length_in_seconds(&self) -> f64 {
        self.frame_count as f64 / self.frame_rate
    }

    pub fn frame_index_at_percent(&self, percent: f64) -> usize {
        if self.frame_count == 0 {
            return 0;
        }

        let mut percent = percent;
        if !(0.0..=1.0).contains(&percent) {
            percent -= percent.floor();
        }

        // `as` saturates: NaN → 0
        let index = (percent * self.frame_count as f64) as usize;
        index.min(self.frame_count - 1)
    }

    /// Inverse of `frame_index_at_percent`, clamped to [0, 1]
    pub fn percent_at_frame_index(&self, index: usize) -> f64 {
        if self.frame_count <= 1 {
            return 0.0;
        }
        (index as f64 / (self.frame_count - 1) as f64).clamp(0.0, 1.0)
    }

    pub fn frame_index_at_time(&self, time: f64) -> usize {
        let total_time = self.length_in_seconds();
        if self.frame_count == 0 || !total_time.is_finite() || total_time == 0.0 {
            return 0;
        }
        self.frame_index_at_percent(time / total_time)
    }

    /// Resolve a requested index: `None` for negative input or an empty
    /// sequence, otherwise `index % frame_count`.
    pub fn wrap_index(&self, index: i64) -> Option<usize> {
        if index < 0 || self.frame_count == 0 {
            return None;
        }
        Some((index as u64 % self.frame_count as u64) as usize)
    }
}
