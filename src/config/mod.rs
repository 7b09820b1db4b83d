//! YAML configuration for the scheduler.
//!
//! A single file declares the global settings and the job list:
//!
//! ```yaml
//! timezone: Asia/Jakarta
//! seed: optional-reproducibility-seed
//! database: ./cadence.db
//! executor:
//!   kind: http
//!   url: https://agent.example.com/trigger
//!   session_key: at-least-8-chars
//! jobs:
//!   - name: morning-nudge
//!     strategy:
//!       type: window
//!       start: "09:00"
//!       end: "11:30"
//!       distribution: weighted
//!     action:
//!       message: Check the overnight queue
//!       priority: normal
//!     retry:
//!       max_attempts: 3
//!       backoff: exponential
//!       timeout_secs: 30
//!     on_failure: notify
//! ```
//!
//! The process executor replaces the `executor` block with:
//!
//! ```yaml
//! executor:
//!   kind: process
//!   trigger_dir: ./triggers
//!   command: agent-cli
//!   args: [--consume]
//! ```
//!
//! Validation happens in two steps: [`YamlLoader`] parses the file, and
//! [`build`] checks every rule (time formats, interval bounds,
//! probability and jitter ranges, HTTPS outside localhost, session key
//! length, unique job names) before handing back core [`crate::Job`]
//! values. Secrets do not belong in this file beyond the session key;
//! keep it out of version control when one is set.

mod builder;
mod error;
mod types;
mod yaml;

pub use builder::{build, BuiltConfig};
pub use error::ConfigError;
pub use types::{ConfigFile, ExecutorConfig, JobConfig};
pub use yaml::YamlLoader;
