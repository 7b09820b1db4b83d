//! Job definition: what to send, and the randomized rule for when.
//!
//! Jobs are immutable after load. The mutable half (next run, fail count)
//! lives in [`crate::storage::JobState`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::retry::RetryPolicy;
use super::types::{JobName, Priority};

/// Errors raised when a job definition fails validation.
#[derive(Debug, Error)]
pub enum JobError {
    /// Job name is empty.
    #[error("job name must not be empty")]
    EmptyName,

    /// Window time is not a valid HH:MM.
    #[error("invalid window time '{0}': expected HH:MM with hour 0-23 and minute 0-59")]
    InvalidWindowTime(String),

    /// Interval bounds are out of range.
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// Probability outside [0, 1].
    #[error("probability must be in [0, 1], got {0}")]
    InvalidProbability(f64),

    /// Jitter outside [0, 1].
    #[error("jitter must be in [0, 1], got {0}")]
    InvalidJitter(f64),

    /// Check interval below one second.
    #[error("check interval must be at least 1 second, got {0}")]
    InvalidCheckInterval(u64),
}

/// Sampling distribution for the window strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    /// Flat across the window.
    Uniform,
    /// Bell around the window midpoint, clipped to the window.
    Gaussian,
    /// Discrete seven-bucket bell; the repo's "natural" default.
    #[default]
    Weighted,
}

/// Strategy-specific scheduling parameters.
///
/// The three strategies share only the next-run contract, so this is a
/// tagged variant rather than a trait hierarchy; the probabilistic arm
/// carries the extra gate parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StrategyConfig {
    /// Fire once per day somewhere inside a local time-of-day window.
    Window {
        /// Window opening, `HH:MM` in the configured zone.
        start: String,
        /// Window close, `HH:MM`; spans midnight when at or before start.
        end: String,
        #[serde(default)]
        distribution: Distribution,
    },
    /// Fire every `min..=max` seconds, optionally jittered.
    Interval {
        /// Lower bound in seconds (>= 1).
        min: u64,
        /// Upper bound in seconds (>= min).
        max: u64,
        /// Multiplicative noise in [0, 1].
        #[serde(default)]
        jitter: f64,
    },
    /// Wake every `check_interval` seconds and fire with `probability`.
    Probabilistic {
        /// Seconds between wake-ups (>= 1).
        check_interval: u64,
        /// Chance of firing on each wake-up, in [0, 1].
        probability: f64,
    },
}

impl StrategyConfig {
    /// Validate parameter ranges. The config builder runs this on load and
    /// the scheduler re-asserts it before constructing strategies.
    pub fn validate(&self) -> Result<(), JobError> {
        match self {
            StrategyConfig::Window { start, end, .. } => {
                parse_hhmm(start).ok_or_else(|| JobError::InvalidWindowTime(start.clone()))?;
                parse_hhmm(end).ok_or_else(|| JobError::InvalidWindowTime(end.clone()))?;
                Ok(())
            }
            StrategyConfig::Interval { min, max, jitter } => {
                if *min < 1 {
                    return Err(JobError::InvalidInterval(format!(
                        "min must be at least 1 second, got {}",
                        min
                    )));
                }
                if max < min {
                    return Err(JobError::InvalidInterval(format!(
                        "max ({}) must be >= min ({})",
                        max, min
                    )));
                }
                if !(0.0..=1.0).contains(jitter) {
                    return Err(JobError::InvalidJitter(*jitter));
                }
                Ok(())
            }
            StrategyConfig::Probabilistic {
                check_interval,
                probability,
            } => {
                if *check_interval < 1 {
                    return Err(JobError::InvalidCheckInterval(*check_interval));
                }
                if !(0.0..=1.0).contains(probability) {
                    return Err(JobError::InvalidProbability(*probability));
                }
                Ok(())
            }
        }
    }

    /// Short tag for logs and status output.
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyConfig::Window { .. } => "window",
            StrategyConfig::Interval { .. } => "interval",
            StrategyConfig::Probabilistic { .. } => "probabilistic",
        }
    }
}

/// Parse `HH:MM` into `(hour, minute)`.
///
/// Accepts a single-digit hour (`9:30`) the way the original config format
/// did; rejects anything past 23:59.
pub(crate) fn parse_hhmm(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

/// The message handed to the executor when a job fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Nudge text delivered to the agent runtime.
    pub message: String,
    /// Delivery priority.
    #[serde(default)]
    pub priority: Priority,
}

/// Opaque delivery hints forwarded to the executor untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// Recipient hint (channel, user, session - executor-defined).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// Thinking-level hint for the agent runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

/// What to do when a fire ends in failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnFailure {
    /// Send a notification through the executor.
    #[default]
    Notify,
    /// Record the failure and stay quiet.
    Silent,
    /// Notify at high priority with an escalation marker.
    Escalate,
}

/// A validated, immutable job definition.
#[derive(Debug, Clone)]
pub struct Job {
    name: JobName,
    strategy: StrategyConfig,
    action: Action,
    enabled: bool,
    retry: Option<RetryPolicy>,
    on_failure: OnFailure,
    delivery: Option<Delivery>,
}

impl Job {
    /// Create an enabled job with defaults for retry, failure handling,
    /// and delivery.
    pub fn new(name: impl Into<JobName>, strategy: StrategyConfig, action: Action) -> Self {
        Self {
            name: name.into(),
            strategy,
            action,
            enabled: true,
            retry: None,
            on_failure: OnFailure::default(),
            delivery: None,
        }
    }

    /// Set whether the job is enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set an explicit retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Set the failure handling mode.
    pub fn with_on_failure(mut self, on_failure: OnFailure) -> Self {
        self.on_failure = on_failure;
        self
    }

    /// Attach delivery hints.
    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Get the job name.
    pub fn name(&self) -> &JobName {
        &self.name
    }

    /// Get the strategy configuration.
    pub fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    /// Get the action.
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Check if the job is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Explicit retry policy, if any; the runner falls back to
    /// [`RetryPolicy::default`].
    pub fn retry(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    /// Failure handling mode.
    pub fn on_failure(&self) -> OnFailure {
        self.on_failure
    }

    /// Delivery hints, if any.
    pub fn delivery(&self) -> Option<&Delivery> {
        self.delivery.as_ref()
    }

    /// Validate the definition: non-empty name plus strategy ranges.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.name.as_str().is_empty() {
            return Err(JobError::EmptyName);
        }
        self.strategy.validate()
    }
}
