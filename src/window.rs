/*
 * This source code is licensed under the Business Source License 1.1
 * (BUSL-1.1). Production use requires a commercial license.
 */

//! Fixed-size sliding window of recent jerk magnitudes.
//!
//! Backed by [`heapless::HistoryBuffer`], seeded full of zeros so that it
//! always holds exactly `N` values and no statistic ever sees a partial
//! window.

use heapless::HistoryBuffer;

/// Default window length.
pub const WINDOW_LEN: usize = 10;

/// Statistics over the current window contents.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowStats {
    /// Arithmetic mean.
    pub avg: f32,
    /// `max - min`.
    pub range: f32,
    /// Entries strictly above `baseline + active_margin`.
    pub active_count: usize,
}

/// Ring buffer of the last `N` jerk magnitudes. Oldest is evicted on push.
#[derive(Clone, Debug)]
pub struct JerkWindow<const N: usize = WINDOW_LEN> {
    buf: HistoryBuffer<f32, N>,
}

impl<const N: usize> JerkWindow<N> {
    /// A window full of zeros.
    pub fn new() -> Self {
        Self { buf: HistoryBuffer::new_with(0.0) }
    }

    /// Push the newest magnitude, evicting the oldest.
    pub fn push(&mut self, jerk: f32) {
        self.buf.write(jerk);
    }

    /// Number of entries; always `N`.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Never true for `N > 0`; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.buf.len() == 0
    }

    /// Most recently pushed value.
    pub fn latest(&self) -> Option<f32> {
        self.buf.recent().copied()
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.buf.oldest_ordered()
    }

    /// Mean, range and active count relative to `baseline + active_margin`.
    pub fn stats(&self, baseline: f32, active_margin: f32) -> WindowStats {
        let values = self.buf.as_slice();
        if values.is_empty() {
            return WindowStats::default();
        }
        let mut sum = 0.0f32;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut active_count = 0;
        let active_above = baseline + active_margin;
        for &v in values {
            sum += v;
            min = min.min(v);
            max = max.max(v);
            if v > active_above {
                active_count += 1;
            }
        }
        WindowStats {
            avg: sum / values.len() as f32,
            range: max - min,
            active_count,
        }
    }
}

impl<const N: usize> Default for JerkWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_with_zeros_and_full() {
        let w: JerkWindow = JerkWindow::new();
        assert_eq!(w.len(), WINDOW_LEN);
        assert!(w.iter().all(|&v| v == 0.0));
        let s = w.stats(1500.0, 500.0);
        assert_eq!(s, WindowStats { avg: 0.0, range: 0.0, active_count: 0 });
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut w: JerkWindow<3> = JerkWindow::new();
        for v in [1.0, 2.0, 3.0, 4.0] {
            w.push(v);
        }
        assert_eq!(w.len(), 3);
        let ordered: alloc::vec::Vec<f32> = w.iter().copied().collect();
        assert_eq!(ordered, [2.0, 3.0, 4.0]);
        assert_eq!(w.latest(), Some(4.0));
    }

    #[test]
    fn test_stats_mean_range_active() {
        let mut w: JerkWindow<4> = JerkWindow::new();
        for v in [1000.0, 2000.0, 2100.0, 3000.0] {
            w.push(v);
        }
        let s = w.stats(1500.0, 500.0);
        assert!((s.avg - 2025.0).abs() < 1e-3);
        assert!((s.range - 2000.0).abs() < 1e-3);
        // strictly above 2000: 2100 and 3000
        assert_eq!(s.active_count, 2);
    }
}
