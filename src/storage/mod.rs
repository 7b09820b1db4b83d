//! Persistence for job state and the append-only run log.
//!
//! This module provides a trait-based store abstraction with pluggable
//! backends: in-memory for tests and one-shot CLI paths, SQLite for the
//! long-running scheduler.

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::time::now_ms;
use crate::core::types::JobName;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested item was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store has been closed; no further operations are accepted.
    #[error("store is closed")]
    Closed,

    /// A persisted record could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Generic backend error.
    #[error("storage error: {0}")]
    Other(String),
}

/// Outcome of a single fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// The executor reported success within the attempt budget.
    Success,
    /// Every attempt failed, or a fatal executor error cut the fire short.
    Failed,
    /// An attempt hit the per-attempt deadline; terminal for the fire.
    Timeout,
}

impl RunStatus {
    /// The literal string persisted in the `runs.status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Timeout => "timeout",
        }
    }

    /// Parse the persisted literal back into a status.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        match s {
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            "timeout" => Ok(RunStatus::Timeout),
            other => Err(StorageError::Corrupt(format!("unknown run status: {}", other))),
        }
    }
}

/// Mutable, persisted scheduling state for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    /// Job this state belongs to.
    pub name: JobName,
    /// Next scheduled fire, epoch ms; None until first scheduling or when
    /// disabled.
    pub next_run: Option<i64>,
    /// Last fire, epoch ms; None before the first fire.
    pub last_run: Option<i64>,
    /// Whether the job's cadence is active.
    pub enabled: bool,
    /// Consecutive failed fires since the last success.
    pub fail_count: u32,
    /// When this state row was created, epoch ms.
    pub created_at: i64,
    /// When this state row was last written, epoch ms.
    pub updated_at: i64,
}

impl JobState {
    /// Fresh state for a job that has never been scheduled.
    pub fn new(name: JobName, enabled: bool) -> Self {
        let now = now_ms();
        Self {
            name,
            next_run: None,
            last_run: None,
            enabled,
            fail_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record the outcome of a fire: success resets the failure streak,
    /// anything else extends it.
    pub fn record_fire(&mut self, fired_at: i64, success: bool) {
        self.last_run = Some(fired_at);
        if success {
            self.fail_count = 0;
        } else {
            self.fail_count += 1;
        }
    }
}

/// One appended entry in the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Surrogate id; assigned by the store on append.
    pub id: Option<i64>,
    /// Job that fired.
    pub job_name: JobName,
    /// When the scheduler intended the fire, epoch ms.
    pub scheduled_at: i64,
    /// When the runner actually started, epoch ms.
    pub triggered_at: i64,
    /// When the fire finished, epoch ms.
    pub completed_at: i64,
    /// Wall time of the whole fire.
    pub duration_ms: i64,
    /// Fire outcome.
    pub status: RunStatus,
    /// Executor response body, when one was produced.
    pub response: Option<serde_json::Value>,
    /// Last error seen during the fire, when it failed.
    pub error: Option<String>,
    /// Executor calls made during the fire.
    pub attempts: u32,
}

/// Store trait persisting scheduler state across restarts.
///
/// Accessed only from the scheduler's control path; backends must be safe
/// for serialized access but are not required to support concurrent
/// mutators.
#[async_trait]
pub trait Store: Send + Sync {
    /// Upsert a job's state by name.
    async fn save_job_state(&self, state: &JobState) -> Result<(), StorageError>;

    /// Get a job's state, or None when it has never been saved.
    async fn get_job_state(&self, name: &JobName) -> Result<Option<JobState>, StorageError>;

    /// All job states, sorted by name.
    async fn get_all_job_states(&self) -> Result<Vec<JobState>, StorageError>;

    /// Append a run record, returning its assigned id.
    async fn record_run(&self, record: RunRecord) -> Result<i64, StorageError>;

    /// Up to `limit` most recent runs for a job, newest first.
    async fn get_recent_runs(
        &self,
        name: &JobName,
        limit: usize,
    ) -> Result<Vec<RunRecord>, StorageError>;

    /// Tear down the store. Closing twice is a no-op; any other operation
    /// after close fails with [`StorageError::Closed`].
    async fn close(&self) -> Result<(), StorageError>;
}

/// Encode a response body for the text column.
pub(crate) fn encode_response(value: &serde_json::Value) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Decode a response body, falling back to the raw string when the stored
/// text is not valid JSON.
pub(crate) fn decode_response(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
}
