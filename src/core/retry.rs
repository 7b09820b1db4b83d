//! Retry policy for a single fire.
//!
//! A fire makes up to `max_attempts` executor calls, sleeping between
//! attempts according to the backoff kind, with each attempt bounded by a
//! per-attempt timeout.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff kind applied between attempts within one fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Always 1 second.
    Fixed,
    /// `attempts` seconds after the n-th attempt.
    Linear,
    /// `2^attempts` seconds after the n-th attempt.
    #[default]
    Exponential,
}

impl Backoff {
    /// Delay to sleep after `attempts` calls have been made.
    pub fn delay(&self, attempts: u32) -> Duration {
        let ms = match self {
            Backoff::Fixed => 1000,
            Backoff::Linear => attempts as u64 * 1000,
            Backoff::Exponential => 2u64.saturating_pow(attempts) * 1000,
        };
        Duration::from_millis(ms)
    }
}

/// Retry policy for a job's fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum executor calls per fire (1 = no retries).
    pub max_attempts: u32,
    /// Backoff kind between attempts.
    #[serde(default)]
    pub backoff: Backoff,
    /// Per-attempt timeout.
    #[serde(with = "serde_duration_secs", rename = "timeout_secs")]
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Build a policy with explicit values.
    pub fn new(max_attempts: u32, backoff: Backoff, timeout: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
            timeout,
        }
    }

    /// A single attempt with no retries, keeping the default timeout.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    /// Default policy: 3 attempts, exponential backoff, 30 s per attempt.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Serde helper storing durations as whole seconds.
mod serde_duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
