//! Process executor: drops a trigger file and invokes the agent command.
//!
//! The trigger file is written atomically (temp file + rename) so the
//! consuming process never observes a half-written payload; the child is
//! then invoked with the file path as its final argument.

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;

use super::executor::{Executor, ExecutorError, TriggerRequest, TriggerResponse};
use crate::core::time::now_ms;
use crate::core::types::Priority;

/// Executor that writes trigger files and runs a child process.
pub struct ProcessExecutor {
    trigger_dir: PathBuf,
    command: String,
    args: Vec<String>,
    sequence: AtomicU64,
}

impl ProcessExecutor {
    /// Build an executor writing into `trigger_dir` and invoking
    /// `command` with `args` plus the trigger file path.
    pub fn new(trigger_dir: impl Into<PathBuf>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            trigger_dir: trigger_dir.into(),
            command: command.into(),
            args,
            sequence: AtomicU64::new(0),
        }
    }

    /// Atomically write `payload` as a JSON file and return its path.
    async fn drop_file(
        &self,
        prefix: &str,
        payload: &serde_json::Value,
    ) -> Result<PathBuf, ExecutorError> {
        tokio::fs::create_dir_all(&self.trigger_dir)
            .await
            .map_err(classify_io)?;

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let final_path = self
            .trigger_dir
            .join(format!("{}-{}-{}.json", prefix, now_ms(), seq));
        let tmp_path = final_path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(payload)
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;
        tokio::fs::write(&tmp_path, bytes).await.map_err(classify_io)?;
        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(classify_io)?;
        Ok(final_path)
    }
}

/// Map I/O failures onto the executor error taxonomy: conditions that no
/// retry can fix are fatal, everything else is transport.
fn classify_io(e: io::Error) -> ExecutorError {
    match e.kind() {
        io::ErrorKind::PermissionDenied
        | io::ErrorKind::StorageFull
        | io::ErrorKind::ReadOnlyFilesystem => ExecutorError::Fatal(e.to_string()),
        _ => ExecutorError::Transport(e.to_string()),
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn trigger(&self, request: TriggerRequest) -> Result<TriggerResponse, ExecutorError> {
        let payload = serde_json::to_value(&request)
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;
        let path = self.drop_file("trigger", &payload).await?;

        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(&path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(classify_io)?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            Ok(TriggerResponse::ok(
                (!stdout.is_empty()).then_some(stdout),
            ))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                format!(
                    "agent command exited with code {}",
                    output.status.code().unwrap_or(-1)
                )
            } else {
                stderr
            };
            Ok(TriggerResponse::failed(detail))
        }
    }

    async fn notify(&self, message: &str, priority: Priority) -> Result<(), ExecutorError> {
        // Notifications are informational; dropping the file is enough,
        // no child process is spawned for them.
        let payload = serde_json::json!({
            "kind": "notification",
            "message": message,
            "priority": priority.as_str(),
        });
        self.drop_file("notify", &payload).await?;
        Ok(())
    }
}
