//! Executor contract: the external collaborator that turns a job's action
//! into an observable effect on an AI-agent runtime.
//!
//! The runner is coupled to this trait only; whether the other side is a
//! network endpoint or a trigger file plus child process is a deployment
//! choice.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::Priority;

/// Errors an executor can raise for a single attempt.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Transport or application failure; worth retrying.
    #[error("executor transport error: {0}")]
    Transport(String),

    /// Resource-level refusal (permission denied, disk full, revoked
    /// credentials); retrying the same fire cannot succeed.
    #[error("fatal executor error: {0}")]
    Fatal(String),
}

impl ExecutorError {
    /// Whether this error ends the current fire instead of retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecutorError::Fatal(_))
    }
}

/// One trigger handed to the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRequest {
    /// Nudge text for the agent runtime.
    pub message: String,
    /// Delivery priority.
    pub priority: Priority,
    /// Opaque delivery context (job name, recipient, thinking level).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

/// The executor's answer to a trigger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerResponse {
    /// Whether the agent runtime accepted and handled the nudge.
    pub success: bool,
    /// Optional response body from the runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error detail when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TriggerResponse {
    /// A successful response with an optional body.
    pub fn ok(message: Option<String>) -> Self {
        Self {
            success: true,
            message,
            error: None,
        }
    }

    /// An unsuccessful response carrying an error description.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// External execution target for fires and failure notifications.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Deliver a nudge. The caller bounds this with the per-attempt
    /// timeout; implementations should not retry internally.
    async fn trigger(&self, request: TriggerRequest) -> Result<TriggerResponse, ExecutorError>;

    /// Best-effort informational message (failure notifications).
    async fn notify(&self, message: &str, priority: Priority) -> Result<(), ExecutorError>;
}
