//! Configuration type definitions for the YAML file format.

use serde::{Deserialize, Serialize};

use crate::core::job::{Action, Delivery, OnFailure, StrategyConfig};
use crate::core::retry::RetryPolicy;

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_database() -> String {
    "./cadence.db".to_string()
}

fn default_true() -> bool {
    true
}

/// The top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// IANA timezone for window strategies.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Optional seed making every random draw reproducible.
    #[serde(default)]
    pub seed: Option<String>,
    /// SQLite database path; `:memory:` is accepted.
    #[serde(default = "default_database")]
    pub database: String,
    /// How fires reach the agent runtime.
    pub executor: ExecutorConfig,
    /// Job definitions.
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

/// Executor selection and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExecutorConfig {
    /// POST triggers to an agent endpoint.
    Http {
        /// Endpoint URL; must be HTTPS outside localhost.
        url: String,
        /// Shared session key, at least 8 characters.
        session_key: String,
    },
    /// Drop a trigger file and invoke the agent command.
    Process {
        /// Directory receiving trigger and notification files.
        trigger_dir: String,
        /// Command invoked with the trigger file path appended.
        command: String,
        /// Extra arguments placed before the file path.
        #[serde(default)]
        args: Vec<String>,
    },
}

/// One job definition from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Unique job name.
    pub name: String,
    /// Scheduling strategy.
    pub strategy: StrategyConfig,
    /// The nudge delivered when the job fires.
    pub action: Action,
    /// Whether the job's cadence is active.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Optional retry policy; the runner defaults to 3 exponential
    /// attempts with a 30 s per-attempt timeout.
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
    /// What to do when a fire fails.
    #[serde(default)]
    pub on_failure: OnFailure,
    /// Opaque delivery hints for the executor.
    #[serde(default)]
    pub delivery: Option<Delivery>,
}
