//! Scheduling strategies: the three randomized rules that answer "when
//! should this job fire next?".
//!
//! The strategies share only the next-run contract, so dispatch is a
//! tagged enum; the probabilistic arm additionally exposes its fire gate,
//! which the scheduler checks by tag before each fire.

mod interval;
mod probabilistic;
mod window;

pub use interval::IntervalStrategy;
pub use probabilistic::ProbabilisticStrategy;
pub use window::WindowStrategy;

use chrono_tz::Tz;

use crate::core::job::{Job, JobError, StrategyConfig};
use crate::core::rng::Rng;

/// A per-job strategy instance. Owns its RNG; never shared across jobs.
#[derive(Debug, Clone)]
pub enum Strategy {
    Window(WindowStrategy),
    Interval(IntervalStrategy),
    Probabilistic(ProbabilisticStrategy),
}

impl Strategy {
    /// Build the strategy instance for a job, re-asserting parameter
    /// validation on the way.
    pub fn for_job(job: &Job, timezone: Tz, rng: Rng) -> Result<Self, JobError> {
        job.validate()?;
        Ok(match job.strategy() {
            StrategyConfig::Window {
                start,
                end,
                distribution,
            } => Strategy::Window(WindowStrategy::new(
                start,
                end,
                *distribution,
                timezone,
                rng,
            )?),
            StrategyConfig::Interval { min, max, jitter } => {
                Strategy::Interval(IntervalStrategy::new(*min, *max, *jitter, rng))
            }
            StrategyConfig::Probabilistic {
                check_interval,
                probability,
            } => Strategy::Probabilistic(ProbabilisticStrategy::new(
                *check_interval,
                *probability,
                rng,
            )),
        })
    }

    /// Compute the next fire time in epoch milliseconds.
    pub fn calculate_next_run(&mut self, last_run: Option<i64>, now: i64) -> i64 {
        match self {
            Strategy::Window(s) => s.calculate_next_run(now),
            Strategy::Interval(s) => s.calculate_next_run(last_run, now),
            Strategy::Probabilistic(s) => s.next_check_time(now),
        }
    }

    /// The probabilistic gate, when this strategy has one.
    pub fn as_probabilistic_mut(&mut self) -> Option<&mut ProbabilisticStrategy> {
        match self {
            Strategy::Probabilistic(s) => Some(s),
            _ => None,
        }
    }

    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Strategy::Window(_) => "window",
            Strategy::Interval(_) => "interval",
            Strategy::Probabilistic(_) => "probabilistic",
        }
    }
}
