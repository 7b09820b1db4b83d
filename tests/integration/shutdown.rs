//! Graceful shutdown integration tests.
//!
//! Stop cancels pending timers immediately but lets an in-flight fire
//! run to completion; afterwards the scheduler is quiescent.

use async_trait::async_trait;
use cadence::testing::MockExecutor;
use cadence::{
    Executor, ExecutorError, InMemoryStore, Priority, RetryPolicy, Scheduler, TriggerRequest,
    TriggerResponse,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::common::{interval_job, wait_for_triggers};

/// Executor whose triggers take a fixed amount of time to answer.
struct SlowExecutor {
    delay: Duration,
    started: AtomicUsize,
    completed: AtomicUsize,
}

impl SlowExecutor {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Executor for SlowExecutor {
    async fn trigger(&self, _request: TriggerRequest) -> Result<TriggerResponse, ExecutorError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(TriggerResponse::ok(None))
    }

    async fn notify(&self, _message: &str, _priority: Priority) -> Result<(), ExecutorError> {
        Ok(())
    }
}

#[tokio::test]
async fn stop_waits_for_in_flight_fire() {
    let store = Arc::new(InMemoryStore::new());
    let executor = Arc::new(SlowExecutor::new(Duration::from_millis(300)));
    let mut scheduler = Scheduler::new(store, executor.clone());
    scheduler.register(interval_job("slow", 1, 1).with_retry(RetryPolicy::once()));

    scheduler.start().await.unwrap();

    // Wait until the fire has started but not finished.
    let begin = tokio::time::Instant::now();
    while executor.started.load(Ordering::SeqCst) == 0 {
        if begin.elapsed() > Duration::from_secs(5) {
            panic!("fire never started");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    scheduler.stop().await;

    // Stop returned only after the in-flight fire completed.
    assert_eq!(executor.completed.load(Ordering::SeqCst), 1);
    assert_eq!(executor.started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_fires_after_stop() {
    let store = Arc::new(InMemoryStore::new());
    let executor = Arc::new(MockExecutor::new());
    let mut scheduler = Scheduler::new(store, executor.clone());
    scheduler.register(interval_job("ticker", 1, 1).with_retry(RetryPolicy::once()));

    scheduler.start().await.unwrap();
    wait_for_triggers(&executor, 1, Duration::from_secs(5)).await;
    scheduler.stop().await;

    let count_at_stop = executor.trigger_count();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(executor.trigger_count(), count_at_stop);
}

#[tokio::test]
async fn stop_before_first_fire_prevents_it() {
    let store = Arc::new(InMemoryStore::new());
    let executor = Arc::new(MockExecutor::new());
    let mut scheduler = Scheduler::new(store, executor.clone());
    scheduler.register(interval_job("never-ran", 1, 1));

    scheduler.start().await.unwrap();
    // Stop while the first timer is still pending.
    scheduler.stop().await;

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(executor.trigger_count(), 0);
}
