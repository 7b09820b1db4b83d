//! Probabilistic strategy: wake on a fixed cadence, fire on a coin flip.
//!
//! The scheduler arms a timer for every check; on each wake-up it asks
//! `should_run` whether this check actually fires the job.

use crate::core::rng::Rng;

/// Probabilistic scheduling rule for one job.
#[derive(Debug, Clone)]
pub struct ProbabilisticStrategy {
    check_interval_secs: u64,
    probability: f64,
    rng: Rng,
}

impl ProbabilisticStrategy {
    /// Build a probabilistic strategy. Ranges are validated by
    /// [`crate::core::job::StrategyConfig::validate`] before this runs.
    pub fn new(check_interval_secs: u64, probability: f64, rng: Rng) -> Self {
        Self {
            check_interval_secs,
            probability,
            rng,
        }
    }

    /// Decide whether this wake-up fires. The degenerate probabilities
    /// answer without consuming a draw, so a seeded schedule is unchanged
    /// by how many checks they gate.
    pub fn should_run(&mut self) -> bool {
        if self.probability <= 0.0 {
            return false;
        }
        if self.probability >= 1.0 {
            return true;
        }
        self.rng.next_f64() < self.probability
    }

    /// The next wake-up: `now + check_interval`.
    pub fn next_check_time(&self, now: i64) -> i64 {
        now + self.check_interval_secs as i64 * 1000
    }
}
