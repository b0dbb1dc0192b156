//! Sliding-window throughput estimation.
//!
//! Orchestrators feed byte positions into [`SpeedAverager`] once per block;
//! the estimate spans the whole retained window rather than the last pair
//! of samples, which smooths out per-block jitter.

use std::collections::VecDeque;
use std::time::Instant;

/// Maximum number of (position, timestamp) samples retained.
const WINDOW_SAMPLES: usize = 100;

/// Sliding-window speed estimator over (position, timestamp) samples.
#[derive(Debug, Default)]
pub struct SpeedAverager {
    samples: VecDeque<(u64, Instant)>,
}

impl SpeedAverager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW_SAMPLES),
        }
    }

    /// Record the current byte position, timestamped now.
    pub fn add(&mut self, position: u64) {
        self.add_at(position, Instant::now());
    }

    fn add_at(&mut self, position: u64, at: Instant) {
        if self.samples.len() == WINDOW_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back((position, at));
    }

    /// Average speed in bytes/second over the current window.
    ///
    /// Returns `None` with fewer than two samples, or when no time has
    /// elapsed between the oldest and newest sample.
    #[must_use]
    pub fn real_speed(&self) -> Option<f64> {
        let (oldest_pos, oldest_at) = *self.samples.front()?;
        let (newest_pos, newest_at) = *self.samples.back()?;
        if self.samples.len() < 2 {
            return None;
        }
        let elapsed = newest_at.duration_since(oldest_at).as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        Some(newest_pos.saturating_sub(oldest_pos) as f64 / elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn no_estimate_without_samples() {
        let avg = SpeedAverager::new();
        assert_eq!(avg.real_speed(), None);
    }

    #[test]
    fn no_estimate_with_one_sample() {
        let mut avg = SpeedAverager::new();
        avg.add(0);
        assert_eq!(avg.real_speed(), None);
    }

    #[test]
    fn no_estimate_with_zero_elapsed_time() {
        let mut avg = SpeedAverager::new();
        let t = Instant::now();
        avg.add_at(0, t);
        avg.add_at(1000, t);
        assert_eq!(avg.real_speed(), None);
    }

    #[test]
    fn positive_speed_over_window() {
        let mut avg = SpeedAverager::new();
        let t0 = Instant::now();
        avg.add_at(0, t0);
        avg.add_at(500, t0 + Duration::from_millis(500));
        avg.add_at(1000, t0 + Duration::from_secs(1));

        let speed = avg.real_speed().expect("estimate");
        assert!((speed - 1000.0).abs() < 1e-6);
        assert!(speed.is_finite());
    }

    #[test]
    fn window_discards_old_samples() {
        let mut avg = SpeedAverager::new();
        let t0 = Instant::now();
        // Slow prefix that must fall out of the window.
        avg.add_at(0, t0);
        // Fast suffix: WINDOW_SAMPLES samples at 1000 bytes/sec.
        for i in 0..WINDOW_SAMPLES as u64 {
            avg.add_at(1_000_000 + i * 1000, t0 + Duration::from_secs(3600 + i));
        }

        let speed = avg.real_speed().expect("estimate");
        assert!((speed - 1000.0).abs() < 1e-6, "speed={speed}");
    }

    #[test]
    fn non_monotonic_positions_do_not_panic() {
        let mut avg = SpeedAverager::new();
        let t0 = Instant::now();
        avg.add_at(1000, t0);
        avg.add_at(500, t0 + Duration::from_secs(1));
        assert_eq!(avg.real_speed(), Some(0.0));
    }
}
