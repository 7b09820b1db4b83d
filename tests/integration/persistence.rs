//! State persistence across scheduler restarts.

use cadence::testing::MockExecutor;
use cadence::{JobName, RetryPolicy, Scheduler, SqliteStore, Store};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::common::{interval_job, wait_for_triggers};

#[tokio::test]
async fn state_and_run_log_survive_restart() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("cadence.db");

    // First process lifetime: fire at least once, then stop.
    {
        let store = Arc::new(SqliteStore::open(&db_path).await.unwrap());
        let executor = Arc::new(MockExecutor::new());
        let mut scheduler = Scheduler::new(Arc::clone(&store), executor.clone());
        scheduler.register(interval_job("durable", 1, 1).with_retry(RetryPolicy::once()));

        scheduler.start().await.unwrap();
        wait_for_triggers(&executor, 1, Duration::from_secs(5)).await;
        scheduler.stop().await;
        store.close().await.unwrap();
    }

    // Second lifetime: the state row and run log are still there.
    {
        let store = Arc::new(SqliteStore::open(&db_path).await.unwrap());
        let state = store
            .get_job_state(&JobName::new("durable"))
            .await
            .unwrap()
            .expect("state must survive restart");
        assert!(state.last_run.is_some());
        assert_eq!(state.fail_count, 0);

        let runs = store
            .get_recent_runs(&JobName::new("durable"), 100)
            .await
            .unwrap();
        assert!(!runs.is_empty());
        store.close().await.unwrap();
    }
}

#[tokio::test]
async fn restart_reschedules_from_current_time() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("cadence.db");

    // Seed a state whose next fire was missed an hour ago.
    {
        let store = SqliteStore::open(&db_path).await.unwrap();
        let mut state = cadence::JobState::new(JobName::new("sleeper"), true);
        let now = cadence::core::time::now_ms();
        state.next_run = Some(now - 3_600_000);
        state.last_run = Some(now - 7_200_000);
        store.save_job_state(&state).await.unwrap();
        store.close().await.unwrap();
    }

    // Restart: the missed fire is dropped, not replayed.
    {
        let store = Arc::new(SqliteStore::open(&db_path).await.unwrap());
        let executor = Arc::new(MockExecutor::new());
        let mut scheduler = Scheduler::new(Arc::clone(&store), executor.clone());
        scheduler.register(interval_job("sleeper", 600, 900));

        scheduler.start().await.unwrap();
        let status = scheduler.status().await;
        scheduler.stop().await;

        let next_run = status[0].next_run.unwrap();
        let now = cadence::core::time::now_ms();
        assert!(next_run >= now + 590_000, "missed fire was replayed");
        assert!(next_run <= now + 910_000);
        assert_eq!(executor.trigger_count(), 0);

        store.close().await.unwrap();
    }
}

#[tokio::test]
async fn disabling_a_job_clears_its_next_run() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("cadence.db");

    {
        let store = Arc::new(SqliteStore::open(&db_path).await.unwrap());
        let executor = Arc::new(MockExecutor::new());
        let mut scheduler = Scheduler::new(Arc::clone(&store), executor);
        scheduler.register(interval_job("paused-job", 600, 900));
        scheduler.start().await.unwrap();
        scheduler.stop().await;

        let state = store
            .get_job_state(&JobName::new("paused-job"))
            .await
            .unwrap()
            .unwrap();
        assert!(state.next_run.is_some());
        store.close().await.unwrap();
    }

    // The same job reloaded as disabled: enablement follows the config
    // and the pending fire is dropped.
    {
        let store = Arc::new(SqliteStore::open(&db_path).await.unwrap());
        let executor = Arc::new(MockExecutor::new());
        let mut scheduler = Scheduler::new(Arc::clone(&store), executor.clone());
        scheduler.register(interval_job("paused-job", 600, 900).with_enabled(false));
        scheduler.start().await.unwrap();
        scheduler.stop().await;

        let state = store
            .get_job_state(&JobName::new("paused-job"))
            .await
            .unwrap()
            .unwrap();
        assert!(!state.enabled);
        assert!(state.next_run.is_none());
        assert_eq!(executor.trigger_count(), 0);
        store.close().await.unwrap();
    }
}
