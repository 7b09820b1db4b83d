//! Common test utilities shared across integration tests.

use cadence::{Action, Job, Priority, StrategyConfig};
use std::time::Duration;

use cadence::testing::MockExecutor;

/// A probabilistic job with a 60 s check interval.
pub fn probabilistic_job(name: &str, probability: f64) -> Job {
    Job::new(
        name,
        StrategyConfig::Probabilistic {
            check_interval: 60,
            probability,
        },
        Action {
            message: format!("nudge from {}", name),
            priority: Priority::Normal,
        },
    )
}

/// An interval job with no jitter.
pub fn interval_job(name: &str, min: u64, max: u64) -> Job {
    Job::new(
        name,
        StrategyConfig::Interval {
            min,
            max,
            jitter: 0.0,
        },
        Action {
            message: format!("nudge from {}", name),
            priority: Priority::Normal,
        },
    )
}

/// Wait until the mock executor has received at least `count` triggers.
///
/// Polls every 10 ms and panics after `timeout`; more reliable than a
/// fixed sleep since execution time can vary.
pub async fn wait_for_triggers(executor: &MockExecutor, count: usize, timeout: Duration) {
    let start = tokio::time::Instant::now();
    loop {
        if executor.trigger_count() >= count {
            return;
        }
        if start.elapsed() > timeout {
            panic!(
                "timeout waiting for {} trigger(s), saw {}",
                count,
                executor.trigger_count()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
