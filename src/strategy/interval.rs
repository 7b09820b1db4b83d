//! Randomized interval strategy.
//!
//! Each fire schedules the next one `min..=max` seconds out, optionally
//! jittered. The interval anchors at the previous run but is rebased to
//! now when that would land in the past - fires are never retroactive.

use crate::core::rng::Rng;

/// Interval scheduling rule for one job.
#[derive(Debug, Clone)]
pub struct IntervalStrategy {
    min_secs: u64,
    max_secs: u64,
    jitter: f64,
    rng: Rng,
}

impl IntervalStrategy {
    /// Build an interval strategy. Bounds are validated by
    /// [`crate::core::job::StrategyConfig::validate`] before this runs.
    pub fn new(min_secs: u64, max_secs: u64, jitter: f64, rng: Rng) -> Self {
        Self {
            min_secs,
            max_secs,
            jitter,
            rng,
        }
    }

    /// Pick the next fire time at or after `now` (epoch ms).
    pub fn calculate_next_run(&mut self, last_run: Option<i64>, now: i64) -> i64 {
        let base = self
            .rng
            .uniform_range(self.min_secs as f64, self.max_secs as f64);
        let interval = if self.jitter > 0.0 {
            self.rng.jittered(base, self.jitter).max(0.0)
        } else {
            base
        };
        let delta_ms = (interval * 1000.0).floor() as i64;

        match last_run {
            None => now + delta_ms,
            Some(last) => (now + delta_ms).max(last + delta_ms),
        }
    }
}
