//! The runner: executes a single fire with retry, backoff, and timeout,
//! records the outcome, and notifies on failure.
//!
//! The runner never returns an error to the scheduler; every fire ends in
//! a [`RunResult`] and exactly one appended [`RunRecord`].

use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::executor::{Executor, TriggerRequest};
use crate::core::job::{Job, OnFailure};
use crate::core::retry::RetryPolicy;
use crate::core::time::now_ms;
use crate::core::types::Priority;
use crate::storage::{RunRecord, RunStatus, Store};

/// Outcome of one fire, handed back to the scheduler.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Terminal status of the fire.
    pub status: RunStatus,
    /// Executor calls made.
    pub attempts: u32,
    /// Last error seen, when the fire did not succeed.
    pub error: Option<String>,
    /// Wall time of the whole fire in milliseconds.
    pub duration_ms: i64,
}

impl RunResult {
    /// Whether the fire succeeded.
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Fires jobs against the executor and records outcomes in the store.
pub struct Runner<S> {
    executor: Arc<dyn Executor>,
    store: Arc<S>,
}

impl<S: Store> Runner<S> {
    /// Create a runner.
    pub fn new(executor: Arc<dyn Executor>, store: Arc<S>) -> Self {
        Self { executor, store }
    }

    /// Execute one fire for `job`. `scheduled_at` is the instant the
    /// scheduler intended the fire; the runner records its own start as
    /// `triggered_at`.
    pub async fn run(&self, job: &Job, scheduled_at: i64) -> RunResult {
        let started = now_ms();
        let retry = job.retry().cloned().unwrap_or_default();
        let request = build_request(job);

        let mut attempts: u32 = 0;
        let mut status = RunStatus::Failed;
        let mut last_error: Option<String> = None;
        let mut response: Option<serde_json::Value> = None;

        while attempts < retry.max_attempts {
            attempts += 1;
            debug!(job = %job.name(), attempt = attempts, "executing trigger");

            match timeout(retry.timeout, self.executor.trigger(request.clone())).await {
                Ok(Ok(reply)) if reply.success => {
                    status = RunStatus::Success;
                    response = serde_json::to_value(&reply).ok();
                    break;
                }
                Ok(Ok(reply)) => {
                    last_error =
                        Some(reply.error.unwrap_or_else(|| "executor reported failure".into()));
                }
                Ok(Err(e)) if e.is_fatal() => {
                    warn!(job = %job.name(), error = %e, "fatal executor error, giving up");
                    last_error = Some(e.to_string());
                    break;
                }
                Ok(Err(e)) => {
                    last_error = Some(e.to_string());
                }
                Err(_) => {
                    // The per-attempt deadline is terminal for the fire.
                    status = RunStatus::Timeout;
                    last_error = Some(format!(
                        "attempt timed out after {}s",
                        retry.timeout.as_secs()
                    ));
                    break;
                }
            }

            if attempts < retry.max_attempts {
                sleep(retry.backoff.delay(attempts)).await;
            }
        }

        let completed = now_ms();
        let result = RunResult {
            status,
            attempts,
            error: last_error.clone(),
            duration_ms: completed - started,
        };

        let record = RunRecord {
            id: None,
            job_name: job.name().clone(),
            scheduled_at,
            triggered_at: started,
            completed_at: completed,
            duration_ms: result.duration_ms,
            status,
            response,
            error: last_error,
            attempts,
        };
        if let Err(e) = self.store.record_run(record).await {
            warn!(job = %job.name(), error = %e, "failed to record run");
        }

        if !result.is_success() {
            self.notify_failure(job, &result, &retry).await;
        }

        result
    }

    /// Send the failure notification unless the job opted out.
    /// Notification failures are logged and swallowed; they never affect
    /// the recorded status.
    async fn notify_failure(&self, job: &Job, result: &RunResult, retry: &RetryPolicy) {
        let (prefix, priority) = match job.on_failure() {
            OnFailure::Silent => return,
            OnFailure::Notify => ("", Priority::Normal),
            OnFailure::Escalate => ("[ESCALATE] ", Priority::High),
        };

        let mut message = format!(
            "{}Job '{}' {} after {}/{} attempt(s)",
            prefix,
            job.name(),
            match result.status {
                RunStatus::Timeout => "timed out",
                _ => "failed",
            },
            result.attempts,
            retry.max_attempts,
        );
        if let Some(error) = &result.error {
            message.push_str(": ");
            message.push_str(error);
        }

        if let Err(e) = self.executor.notify(&message, priority).await {
            warn!(job = %job.name(), error = %e, "failure notification could not be delivered");
        }
    }
}

/// Assemble the trigger payload from a job's action and delivery hints.
fn build_request(job: &Job) -> TriggerRequest {
    let mut context = serde_json::Map::new();
    context.insert(
        "job".to_string(),
        serde_json::Value::String(job.name().as_str().to_string()),
    );
    if let Some(delivery) = job.delivery() {
        if let Some(recipient) = &delivery.recipient {
            context.insert(
                "recipient".to_string(),
                serde_json::Value::String(recipient.clone()),
            );
        }
        if let Some(thinking) = &delivery.thinking {
            context.insert(
                "thinking".to_string(),
                serde_json::Value::String(thinking.clone()),
            );
        }
    }

    TriggerRequest {
        message: job.action().message.clone(),
        priority: job.action().priority,
        context: Some(serde_json::Value::Object(context)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::{Action, StrategyConfig};
    use crate::core::retry::Backoff;
    use crate::storage::InMemoryStore;
    use crate::testing::MockExecutor;
    use std::time::Duration;

    fn job(name: &str) -> Job {
        Job::new(
            name,
            StrategyConfig::Interval {
                min: 60,
                max: 120,
                jitter: 0.0,
            },
            Action {
                message: "nudge".to_string(),
                priority: Priority::Normal,
            },
        )
    }

    fn runner(executor: Arc<MockExecutor>) -> (Runner<InMemoryStore>, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (Runner::new(executor, Arc::clone(&store)), store)
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let executor = Arc::new(MockExecutor::new());
        let (runner, store) = runner(executor.clone());

        let result = runner.run(&job("ok"), 1_000).await;

        assert!(result.is_success());
        assert_eq!(result.attempts, 1);
        assert!(result.error.is_none());
        assert_eq!(executor.trigger_count(), 1);

        let runs = store
            .get_recent_runs(&"ok".into(), 10)
            .await
            .unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Success);
        assert_eq!(runs[0].scheduled_at, 1_000);
        assert!(runs[0].triggered_at >= 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success_with_fixed_backoff() {
        let executor = Arc::new(
            MockExecutor::new()
                .with_failures(2)
                .with_failure_error("not ready"),
        );
        let (runner, store) = runner(executor.clone());
        let job = job("flaky").with_retry(RetryPolicy::new(
            3,
            Backoff::Fixed,
            Duration::from_secs(30),
        ));

        let virtual_start = tokio::time::Instant::now();
        let result = runner.run(&job, 0).await;
        let virtual_elapsed = virtual_start.elapsed();

        assert!(result.is_success());
        assert_eq!(result.attempts, 3);
        // Two fixed 1 s backoffs sit between the three attempts.
        assert!(virtual_elapsed >= Duration::from_millis(2000));

        let runs = store.get_recent_runs(&"flaky".into(), 10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Success);
        assert_eq!(runs[0].attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_cap_is_respected() {
        let executor = Arc::new(MockExecutor::new().with_failures(u32::MAX));
        let (runner, store) = runner(executor.clone());
        let job = job("doomed").with_retry(RetryPolicy::new(
            4,
            Backoff::Fixed,
            Duration::from_secs(30),
        ));

        let result = runner.run(&job, 0).await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.attempts, 4);
        assert_eq!(executor.trigger_count(), 4);

        let runs = store.get_recent_runs(&"doomed".into(), 10).await.unwrap();
        assert_eq!(runs[0].attempts, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_terminal() {
        let executor = Arc::new(MockExecutor::new().with_hang());
        let (runner, store) = runner(executor.clone());
        let job = job("stuck").with_retry(RetryPolicy::new(
            5,
            Backoff::Fixed,
            Duration::from_secs(2),
        ));

        let result = runner.run(&job, 0).await;

        assert_eq!(result.status, RunStatus::Timeout);
        // The first attempt hit the deadline; no further attempts follow.
        assert_eq!(result.attempts, 1);
        assert_eq!(executor.trigger_count(), 1);

        let runs = store.get_recent_runs(&"stuck".into(), 10).await.unwrap();
        assert_eq!(runs[0].status, RunStatus::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_stops_retries() {
        let executor = Arc::new(MockExecutor::new().with_fatal("permission denied"));
        let (runner, _) = runner(executor.clone());
        let job = job("refused").with_retry(RetryPolicy::new(
            5,
            Backoff::Fixed,
            Duration::from_secs(30),
        ));

        let result = runner.run(&job, 0).await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.attempts, 1);
        assert!(result.error.unwrap().contains("permission denied"));
        assert_eq!(executor.trigger_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exponential_backoff_between_attempts() {
        let executor = Arc::new(MockExecutor::new().with_failures(2));
        let (runner, _) = runner(executor.clone());
        let job = job("spaced").with_retry(RetryPolicy::new(
            3,
            Backoff::Exponential,
            Duration::from_secs(30),
        ));

        let virtual_start = tokio::time::Instant::now();
        let result = runner.run(&job, 0).await;
        let virtual_elapsed = virtual_start.elapsed();

        assert!(result.is_success());
        // 2^1 + 2^2 seconds of backoff between the three attempts.
        assert!(virtual_elapsed >= Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_failure_notification_sent_by_default() {
        let executor = Arc::new(MockExecutor::new().with_failures(u32::MAX));
        let (runner, _) = runner(executor.clone());
        let job = job("noisy").with_retry(RetryPolicy::new(
            1,
            Backoff::Fixed,
            Duration::from_secs(30),
        ));

        runner.run(&job, 0).await;

        let notifications = executor.notifications();
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].0.contains("noisy"));
        assert_eq!(notifications[0].1, Priority::Normal);
    }

    #[tokio::test]
    async fn test_silent_jobs_do_not_notify() {
        let executor = Arc::new(MockExecutor::new().with_failures(u32::MAX));
        let (runner, _) = runner(executor.clone());
        let job = job("quiet")
            .with_retry(RetryPolicy::once())
            .with_on_failure(OnFailure::Silent);

        runner.run(&job, 0).await;

        assert!(executor.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_escalation_prefixes_and_raises_priority() {
        let executor = Arc::new(MockExecutor::new().with_failures(u32::MAX));
        let (runner, store) = runner(executor.clone());
        let job = job("critical")
            .with_retry(RetryPolicy::once())
            .with_on_failure(OnFailure::Escalate);

        let result = runner.run(&job, 0).await;

        assert_eq!(result.status, RunStatus::Failed);
        let notifications = executor.notifications();
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].0.starts_with("[ESCALATE] "));
        assert_eq!(notifications[0].1, Priority::High);

        let runs = store.get_recent_runs(&"critical".into(), 10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_notification_failure_is_swallowed() {
        let executor = Arc::new(
            MockExecutor::new()
                .with_failures(u32::MAX)
                .with_notify_failure(),
        );
        let (runner, store) = runner(executor.clone());
        let job = job("unlucky").with_retry(RetryPolicy::once());

        let result = runner.run(&job, 0).await;

        // The failed notification does not change the recorded outcome.
        assert_eq!(result.status, RunStatus::Failed);
        let runs = store.get_recent_runs(&"unlucky".into(), 10).await.unwrap();
        assert_eq!(runs[0].status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_request_carries_delivery_hints() {
        use crate::core::job::Delivery;

        let executor = Arc::new(MockExecutor::new());
        let (runner, _) = runner(executor.clone());
        let job = job("hinted").with_delivery(Delivery {
            recipient: Some("ops".to_string()),
            thinking: Some("low".to_string()),
        });

        runner.run(&job, 0).await;

        let requests = executor.requests();
        let context = requests[0].context.as_ref().unwrap();
        assert_eq!(context["job"], serde_json::json!("hinted"));
        assert_eq!(context["recipient"], serde_json::json!("ops"));
        assert_eq!(context["thinking"], serde_json::json!("low"));
    }
}
