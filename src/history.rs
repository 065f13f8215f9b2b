//! Bounded excitement history
//!
//! Append-only ring of timestamped samples with FIFO eviction, plus the
//! scrollable viewing-window query used by the excitement chart.

use crate::types::HistorySample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of samples retained
pub const HISTORY_CAPACITY: usize = 300;

/// Default viewing window size in samples
pub const VIEW_WINDOW_SIZE: usize = 30;

/// Bounded, time-ordered sample buffer.
///
/// Samples are only ever appended; the oldest sample is evicted once the
/// buffer exceeds its capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryBuffer {
    samples: VecDeque<HistorySample>,
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryBuffer {
    /// Create a buffer with the standard capacity of [`HISTORY_CAPACITY`]
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create a buffer with a specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Append a sample, evicting the oldest one on overflow
    pub fn push(&mut self, sample: HistorySample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent sample, if any
    pub fn latest(&self) -> Option<&HistorySample> {
        self.samples.back()
    }

    /// Iterate samples oldest-first
    pub fn iter(&self) -> impl Iterator<Item = &HistorySample> {
        self.samples.iter()
    }

    /// Query a viewing window of `window_size` samples, `offset` samples
    /// back from the live edge.
    ///
    /// `offset = 0` follows the live edge; a positive offset pauses the
    /// view at a fixed point in the past. The returned slice covers
    /// `[max(0, len - offset - window_size), len - offset)`. The offset is
    /// clamped to `[0, len]` rather than erroring, and the result is an
    /// owned snapshot that stays self-consistent under later appends.
    pub fn window(&self, offset: usize, window_size: usize) -> Vec<HistorySample> {
        let len = self.samples.len();
        let offset = offset.min(len);
        let end = len - offset;
        let start = end.saturating_sub(window_size);
        self.samples.range(start..end).cloned().collect()
    }

    /// Drop all samples (session reset)
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn sample(seq: i64) -> HistorySample {
        HistorySample {
            timestamp: Utc.timestamp_millis_opt(seq * 1000).unwrap(),
            excitement: seq as f64,
            trigger: None,
        }
    }

    fn filled(n: i64) -> HistoryBuffer {
        let mut buf = HistoryBuffer::new();
        for i in 0..n {
            buf.push(sample(i));
        }
        buf
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let buf = filled(450);
        assert_eq!(buf.len(), HISTORY_CAPACITY);
    }

    #[test]
    fn eviction_keeps_most_recent_in_order() {
        // After 450 appends the buffer holds exactly samples 150..450.
        let buf = filled(450);
        let values: Vec<f64> = buf.iter().map(|s| s.excitement).collect();
        let expected: Vec<f64> = (150..450).map(|i| i as f64).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn live_window_covers_most_recent_thirty() {
        let buf = filled(300);
        let window = buf.window(0, VIEW_WINDOW_SIZE);
        assert_eq!(window.len(), 30);
        // Indices [270, 300)
        assert_eq!(window.first().unwrap().excitement, 270.0);
        assert_eq!(window.last().unwrap().excitement, 299.0);
    }

    #[test]
    fn offset_window_pauses_in_the_past() {
        let buf = filled(300);
        let window = buf.window(50, VIEW_WINDOW_SIZE);
        // Indices [220, 250)
        assert_eq!(window.len(), 30);
        assert_eq!(window.first().unwrap().excitement, 220.0);
        assert_eq!(window.last().unwrap().excitement, 249.0);
    }

    #[test]
    fn short_buffer_returns_partial_window() {
        let buf = filled(10);
        let window = buf.window(0, VIEW_WINDOW_SIZE);
        assert_eq!(window.len(), 10);
        assert_eq!(window.first().unwrap().excitement, 0.0);
    }

    #[test]
    fn oversized_offset_is_clamped() {
        let buf = filled(10);
        assert!(buf.window(500, VIEW_WINDOW_SIZE).is_empty());
        assert!(filled(0).window(3, VIEW_WINDOW_SIZE).is_empty());
    }

    #[test]
    fn window_snapshot_survives_later_appends() {
        let mut buf = filled(40);
        let window = buf.window(0, VIEW_WINDOW_SIZE);
        buf.push(sample(40));
        buf.push(sample(41));
        // The snapshot still ends at the sample that was live at query time.
        assert_eq!(window.last().unwrap().excitement, 39.0);
    }
}
