//! HTTP executor: POSTs triggers to an agent endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;

use super::executor::{Executor, ExecutorError, TriggerRequest, TriggerResponse};
use crate::core::types::Priority;

/// Executor that delivers nudges to an agent runtime over HTTPS.
///
/// The URL and session key are validated by the config builder (HTTPS
/// outside localhost, key length); this type only speaks the wire
/// protocol.
pub struct HttpExecutor {
    client: reqwest::Client,
    url: String,
    session_key: String,
}

impl HttpExecutor {
    /// Build an executor for the given endpoint.
    pub fn new(url: impl Into<String>, session_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            session_key: session_key.into(),
        }
    }

    async fn post(&self, body: &serde_json::Value) -> Result<reqwest::Response, ExecutorError> {
        let response = self
            .client
            .post(&self.url)
            .header("x-session-key", &self.session_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            // Bad credentials cannot heal within a fire.
            return Err(ExecutorError::Fatal(format!(
                "agent endpoint refused credentials ({})",
                status
            )));
        }
        if status == StatusCode::INSUFFICIENT_STORAGE {
            return Err(ExecutorError::Fatal(format!(
                "agent endpoint out of storage ({})",
                status
            )));
        }
        if !status.is_success() {
            return Err(ExecutorError::Transport(format!(
                "agent endpoint returned {}",
                status
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn trigger(&self, request: TriggerRequest) -> Result<TriggerResponse, ExecutorError> {
        let body = serde_json::to_value(&request)
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;
        let response = self.post(&body).await?;
        response
            .json::<TriggerResponse>()
            .await
            .map_err(|e| ExecutorError::Transport(format!("invalid response body: {}", e)))
    }

    async fn notify(&self, message: &str, priority: Priority) -> Result<(), ExecutorError> {
        let body = serde_json::json!({
            "kind": "notification",
            "message": message,
            "priority": priority.as_str(),
        });
        self.post(&body).await?;
        Ok(())
    }
}
