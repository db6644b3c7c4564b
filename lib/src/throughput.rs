//! Sample-rate measurement
//!
//! Counts decoded pairs per wall-clock window and yields a report once per
//! elapsed interval. The clock instant is passed into `poll_at` so tests
//! can drive a synthetic clock.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct ThroughputMeter {
    interval: Duration,
    window_start: Instant,
    pairs: u64,
}

impl ThroughputMeter {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: Duration, now: Instant) -> Self {
        ThroughputMeter {
            interval,
            window_start: now,
            pairs: 0,
        }
    }

    /// Account for `pairs` decoded sample pairs in the current window.
    pub fn record(&mut self, pairs: u64) {
        self.pairs += pairs;
    }

    /// Yield the integer pairs-per-second rate once the report interval has
    /// elapsed, resetting the counter and the window. Returns `None` while
    /// the window is still open.
    pub fn poll(&mut self) -> Option<u64> {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> Option<u64> {
        let elapsed = now.duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }
        let rate = (self.pairs as f64 / elapsed.as_secs_f64()) as u64;
        self.pairs = 0;
        self.window_start = now;
        Some(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_one_report_per_elapsed_window() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::starting_at(SECOND, start);

        meter.record(48_000);
        assert_eq!(meter.poll_at(start + SECOND), Some(48_000));

        // The counter and window were reset by the report.
        assert_eq!(meter.poll_at(start + SECOND), None);
        assert_eq!(meter.poll_at(start + 2 * SECOND), Some(0));
    }

    #[test]
    fn test_no_report_before_window_elapses() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::starting_at(SECOND, start);

        meter.record(100);
        assert_eq!(meter.poll_at(start + Duration::from_millis(999)), None);
        // Nothing was lost while waiting.
        assert_eq!(meter.poll_at(start + SECOND), Some(100));
    }

    #[test]
    fn test_rate_is_integer_truncated() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::starting_at(SECOND, start);

        meter.record(3);
        assert_eq!(meter.poll_at(start + 2 * SECOND), Some(1));
    }

    #[test]
    fn test_rate_scales_with_elapsed_time() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::starting_at(SECOND, start);

        meter.record(3000);
        assert_eq!(meter.poll_at(start + Duration::from_millis(1500)), Some(2000));
    }
}
