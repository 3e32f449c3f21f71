//! Count buffering and windowed averages.
//!
//! Per-frame counts accumulate in a buffer; when the aggregation interval
//! has elapsed, `flush()` drains the buffer into one `CountWindow`. The
//! buffer clears and the timer resets inside `flush()`, before any
//! delivery attempt, so a failed POST cannot resurrect old counts. The
//! window is simply dropped.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// One aggregated window, ready for delivery.
///
/// `window_start` is declared as `window_end - interval` rather than
/// measured from the oldest buffered sample; the backend stores these as
/// nominal window labels.
#[derive(Clone, Debug)]
pub struct CountWindow {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub avg_count: f64,
}

/// Accumulates per-frame people counts and emits windowed averages.
pub struct CountAggregator {
    buffer: VecDeque<u32>,
    interval: Duration,
    last_flush: Instant,
}

impl CountAggregator {
    pub fn new(interval: Duration) -> Self {
        Self {
            buffer: VecDeque::new(),
            interval,
            last_flush: Instant::now(),
        }
    }

    /// Record one frame's count.
    pub fn record(&mut self, count: u32) {
        self.buffer.push_back(count);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Has the aggregation interval elapsed since the last flush.
    pub fn is_due(&self) -> bool {
        self.last_flush.elapsed() >= self.interval
    }

    /// Drain the buffer into a window.
    ///
    /// An empty buffer is a no-op: no window, timer untouched, so the next
    /// recorded count flushes promptly. Otherwise the buffer is cleared and
    /// the flush timer reset unconditionally, before the caller sees the
    /// window at all.
    pub fn flush(&mut self) -> Option<CountWindow> {
        if self.buffer.is_empty() {
            return None;
        }

        let samples = self.buffer.len();
        let sum: u64 = self.buffer.iter().map(|&c| u64::from(c)).sum();
        let avg_count = sum as f64 / samples as f64;

        self.buffer.clear();
        self.last_flush = Instant::now();

        let window_end = Utc::now();
        let interval = chrono::Duration::from_std(self.interval)
            .unwrap_or_else(|_| chrono::Duration::zero());
        Some(CountWindow {
            window_start: window_end - interval,
            window_end,
            avg_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn flush_emits_arithmetic_mean() {
        let mut agg = CountAggregator::new(Duration::from_secs(15));
        for count in [2u32, 3, 4, 5] {
            agg.record(count);
        }
        assert_eq!(agg.len(), 4);

        let window = agg.flush().expect("non-empty buffer must emit a window");
        assert_eq!(window.avg_count, 3.5);
        assert!(agg.is_empty());

        let span = window.window_end - window.window_start;
        assert_eq!(span.num_seconds(), 15);
        let age = Utc::now() - window.window_end;
        assert!(age.num_seconds().abs() < 5);
    }

    #[test]
    fn fractional_mean_uses_float_division() {
        let mut agg = CountAggregator::new(Duration::from_secs(15));
        agg.record(1);
        agg.record(2);
        let window = agg.flush().unwrap();
        assert_eq!(window.avg_count, 1.5);
    }

    #[test]
    fn empty_buffer_flush_is_a_no_op() {
        let mut agg = CountAggregator::new(Duration::from_millis(50));
        thread::sleep(Duration::from_millis(60));
        assert!(agg.is_due());

        assert!(agg.flush().is_none());
        // Timer untouched: still due until a real flush happens.
        assert!(agg.is_due());

        agg.record(7);
        let window = agg.flush().unwrap();
        assert_eq!(window.avg_count, 7.0);
        assert!(!agg.is_due());
    }

    #[test]
    fn flush_resets_state_regardless_of_what_caller_does() {
        let mut agg = CountAggregator::new(Duration::from_secs(3600));
        agg.record(4);
        agg.record(6);

        // Simulate a failed delivery by dropping the window immediately.
        let window = agg.flush().unwrap();
        drop(window);

        assert!(agg.is_empty());
        assert!(!agg.is_due());

        // Nothing from the dropped window leaks into the next one.
        agg.record(10);
        let next = agg.flush().unwrap();
        assert_eq!(next.avg_count, 10.0);
    }

    #[test]
    fn single_sample_window() {
        let mut agg = CountAggregator::new(Duration::from_secs(1));
        agg.record(3);
        assert_eq!(agg.flush().unwrap().avg_count, 3.0);
    }
}
