//! Testing utilities for users of the cadence library.
//!
//! [`MockExecutor`] is a scriptable stand-in for the real executors: it
//! records every trigger and notification, and can be told to fail the
//! first N attempts, fail fatally, hang until the caller's timeout, or
//! reject notifications.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::core::types::Priority;
use crate::execution::{Executor, ExecutorError, TriggerRequest, TriggerResponse};

/// Scriptable executor double.
///
/// Defaults to answering every trigger with success and accepting every
/// notification.
pub struct MockExecutor {
    failures_remaining: AtomicU32,
    failure_error: Mutex<String>,
    fatal_error: Mutex<Option<String>>,
    hang: AtomicBool,
    notify_fails: AtomicBool,
    requests: Mutex<Vec<TriggerRequest>>,
    notifications: Mutex<Vec<(String, Priority)>>,
}

impl MockExecutor {
    /// An executor that always succeeds.
    pub fn new() -> Self {
        Self {
            failures_remaining: AtomicU32::new(0),
            failure_error: Mutex::new("mock failure".to_string()),
            fatal_error: Mutex::new(None),
            hang: AtomicBool::new(false),
            notify_fails: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// Fail the first `n` triggers with an unsuccessful response, then
    /// succeed. `u32::MAX` fails forever.
    pub fn with_failures(self, n: u32) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Error text carried by scripted failures.
    pub fn with_failure_error(self, error: impl Into<String>) -> Self {
        *self.failure_error.lock().expect("lock poisoned") = error.into();
        self
    }

    /// Answer every trigger with a fatal executor error.
    pub fn with_fatal(self, error: impl Into<String>) -> Self {
        *self.fatal_error.lock().expect("lock poisoned") = Some(error.into());
        self
    }

    /// Never answer a trigger; the caller's per-attempt timeout decides.
    pub fn with_hang(self) -> Self {
        self.hang.store(true, Ordering::SeqCst);
        self
    }

    /// Reject every notification with a transport error.
    pub fn with_notify_failure(self) -> Self {
        self.notify_fails.store(true, Ordering::SeqCst);
        self
    }

    /// Every trigger request received, in order.
    pub fn requests(&self) -> Vec<TriggerRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    /// Number of triggers received.
    pub fn trigger_count(&self) -> usize {
        self.requests.lock().expect("lock poisoned").len()
    }

    /// Every notification received, in order.
    pub fn notifications(&self) -> Vec<(String, Priority)> {
        self.notifications.lock().expect("lock poisoned").clone()
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn trigger(&self, request: TriggerRequest) -> Result<TriggerResponse, ExecutorError> {
        self.requests.lock().expect("lock poisoned").push(request);

        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if let Some(error) = self.fatal_error.lock().expect("lock poisoned").clone() {
            return Err(ExecutorError::Fatal(error));
        }

        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != u32::MAX {
                self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            }
            let error = self.failure_error.lock().expect("lock poisoned").clone();
            return Ok(TriggerResponse::failed(error));
        }

        Ok(TriggerResponse::ok(Some("ok".to_string())))
    }

    async fn notify(&self, message: &str, priority: Priority) -> Result<(), ExecutorError> {
        self.notifications
            .lock()
            .expect("lock poisoned")
            .push((message.to_string(), priority));

        if self.notify_fails.load(Ordering::SeqCst) {
            return Err(ExecutorError::Transport("notification rejected".to_string()));
        }
        Ok(())
    }
}
