//! Scheduler: one timer per job, randomized re-arming after every fire.
//!
//! The scheduler owns the in-memory state map and is the single writer of
//! persisted state. Each enabled job gets its own timer task; fires for
//! different jobs run in parallel, but a job is re-armed only after its
//! fire returns, so at most one fire per job is ever in flight.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use chrono_tz::Tz;

use crate::core::job::{Job, JobError};
use crate::core::rng::Rng;
use crate::core::time::now_ms;
use crate::core::types::JobName;
use crate::execution::{Executor, Runner};
use crate::storage::{JobState, Store};
use crate::strategy::Strategy;

/// Errors that can occur when starting the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A registered job failed validation.
    #[error("invalid job '{name}': {source}")]
    InvalidJob {
        name: JobName,
        #[source]
        source: JobError,
    },

    /// Two registered jobs share a name.
    #[error("duplicate job name: {0}")]
    DuplicateJob(JobName),
}

/// Point-in-time view of one job, in registration order.
#[derive(Debug, Clone)]
pub struct JobStatus {
    /// Job name.
    pub name: JobName,
    /// Next scheduled fire, epoch ms.
    pub next_run: Option<i64>,
    /// Last fire, epoch ms.
    pub last_run: Option<i64>,
    /// Whether the cadence is active.
    pub enabled: bool,
}

/// Shared half of the scheduler, owned by the timer tasks.
struct Inner<S> {
    store: Arc<S>,
    runner: Runner<S>,
    timezone: Tz,
    seed: Option<String>,
    states: RwLock<HashMap<JobName, JobState>>,
    running: AtomicBool,
}

/// The scheduling engine.
pub struct Scheduler<S: Store> {
    jobs: Vec<Job>,
    inner: Arc<Inner<S>>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: Store + 'static> Scheduler<S> {
    /// Create a scheduler over the given store and executor, in UTC.
    pub fn new(store: Arc<S>, executor: Arc<dyn Executor>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            inner: Arc::new(Inner {
                runner: Runner::new(executor, Arc::clone(&store)),
                store,
                timezone: chrono_tz::UTC,
                seed: None,
                states: RwLock::new(HashMap::new()),
                running: AtomicBool::new(false),
            }),
            shutdown,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Set the IANA timezone used by window strategies.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        // Inner is not yet shared before start; get_mut always succeeds
        // here but falls through quietly if it ever does not.
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.timezone = timezone;
        }
        self
    }

    /// Set the deterministic seed; each job derives its own RNG from it.
    pub fn with_seed(mut self, seed: Option<String>) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.seed = seed;
        }
        self
    }

    /// Register a job with the scheduler.
    pub fn register(&mut self, job: Job) {
        self.jobs.push(job);
    }

    /// Registered jobs, in registration order.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Whether the scheduler is currently running.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Start the scheduler: load or initialize each job's state, persist
    /// it, and arm a timer per enabled job. Calling start on a running
    /// scheduler is a no-op.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shutdown.send_replace(false);

        let mut seen: HashSet<JobName> = HashSet::new();
        let mut armed: Vec<(Job, Strategy)> = Vec::new();
        let now = now_ms();

        for job in &self.jobs {
            if !seen.insert(job.name().clone()) {
                self.inner.running.store(false, Ordering::SeqCst);
                return Err(SchedulerError::DuplicateJob(job.name().clone()));
            }

            let rng = Rng::derive(self.inner.seed.as_deref(), job.name().as_str());
            let mut strategy = match Strategy::for_job(job, self.inner.timezone, rng) {
                Ok(strategy) => strategy,
                Err(e) => {
                    self.inner.running.store(false, Ordering::SeqCst);
                    return Err(SchedulerError::InvalidJob {
                        name: job.name().clone(),
                        source: e,
                    });
                }
            };

            let loaded = match self.inner.store.get_job_state(job.name()).await {
                Ok(state) => state,
                Err(e) => {
                    // Unreadable state: skip it and rebuild from the job.
                    warn!(job = %job.name(), error = %e, "unreadable job state, reinitializing");
                    None
                }
            };
            let mut state =
                loaded.unwrap_or_else(|| JobState::new(job.name().clone(), job.is_enabled()));

            // The job definition is the authority on enablement.
            state.enabled = job.is_enabled();
            if !job.is_enabled() {
                state.next_run = None;
            } else if state.next_run.map_or(true, |t| t <= now) {
                // Never scheduled, or the stored fire time already passed
                // while we were down. Missed fires are not made up; the
                // next one is computed from the current time.
                state.next_run = Some(strategy.calculate_next_run(state.last_run, now));
            }
            state.updated_at = now;

            if let Err(e) = self.inner.store.save_job_state(&state).await {
                warn!(job = %job.name(), error = %e, "failed to persist initial state");
            }
            self.inner
                .states
                .write()
                .await
                .insert(job.name().clone(), state);

            if job.is_enabled() {
                armed.push((job.clone(), strategy));
            } else {
                debug!(job = %job.name(), "job disabled, no timer armed");
            }
        }

        let mut tasks = self.tasks.lock().await;
        for (job, strategy) in armed {
            let inner = Arc::clone(&self.inner);
            let shutdown = self.shutdown.subscribe();
            tasks.push(tokio::spawn(run_job_loop(inner, job, strategy, shutdown)));
        }
        info!(jobs = self.jobs.len(), "scheduler started");
        Ok(())
    }

    /// Stop the scheduler: cancel pending timers, wait for in-flight
    /// fires to complete, persist the state map. Calling stop on a
    /// stopped scheduler is a no-op.
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.send_replace(true);

        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "job timer task ended abnormally");
            }
        }
        drop(tasks);

        let states = self.inner.states.read().await;
        for state in states.values() {
            if let Err(e) = self.inner.store.save_job_state(state).await {
                warn!(job = %state.name, error = %e, "failed to persist state on stop");
            }
        }
        info!("scheduler stopped");
    }

    /// Current status of every job, in registration order, with absolute
    /// millisecond timestamps.
    pub async fn status(&self) -> Vec<JobStatus> {
        let states = self.inner.states.read().await;
        self.jobs
            .iter()
            .map(|job| {
                let state = states.get(job.name());
                JobStatus {
                    name: job.name().clone(),
                    next_run: state.and_then(|s| s.next_run),
                    last_run: state.and_then(|s| s.last_run),
                    enabled: state.map_or(job.is_enabled(), |s| s.enabled),
                }
            })
            .collect()
    }
}

/// Timer loop for one job: sleep until the scheduled fire, fire, re-arm.
async fn run_job_loop<S: Store>(
    inner: Arc<Inner<S>>,
    job: Job,
    mut strategy: Strategy,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let Some(next_run) = inner.next_run_of(job.name()).await else {
            break;
        };
        let delay = Duration::from_millis((next_run - now_ms()).max(0) as u64);

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            _ = sleep(delay) => {}
        }

        if !inner.running.load(Ordering::SeqCst) {
            break;
        }
        inner.execute_job(&job, &mut strategy, next_run).await;
        if !inner.running.load(Ordering::SeqCst) {
            break;
        }
    }
}

impl<S: Store> Inner<S> {
    async fn next_run_of(&self, name: &JobName) -> Option<i64> {
        self.states.read().await.get(name).and_then(|s| s.next_run)
    }

    /// One timer wake-up for `job`. Faults are logged, never propagated:
    /// a job-local failure must not take the scheduler down.
    async fn execute_job(&self, job: &Job, strategy: &mut Strategy, scheduled_at: i64) {
        let now = now_ms();

        // Probabilistic jobs flip their coin before anything fires.
        if let Some(gate) = strategy.as_probabilistic_mut() {
            if !gate.should_run() {
                let next_check = gate.next_check_time(now);
                debug!(job = %job.name(), "wake-up gated off, advancing to next check");
                self.update_state(job.name(), |state| {
                    state.next_run = Some(next_check);
                })
                .await;
                return;
            }
        }

        info!(job = %job.name(), strategy = strategy.kind(), "firing job");
        let result = self.runner.run(job, scheduled_at).await;

        let fired_at = now_ms();
        let next_run = strategy.calculate_next_run(Some(fired_at), fired_at);
        if result.is_success() {
            info!(
                job = %job.name(),
                attempts = result.attempts,
                duration_ms = result.duration_ms,
                "fire succeeded"
            );
        } else {
            warn!(
                job = %job.name(),
                status = result.status.as_str(),
                attempts = result.attempts,
                error = result.error.as_deref().unwrap_or("unknown"),
                "fire did not succeed"
            );
        }

        self.update_state(job.name(), |state| {
            state.record_fire(fired_at, result.is_success());
            state.next_run = Some(next_run);
        })
        .await;
    }

    /// Apply `mutate` to the job's in-memory state and persist the result.
    async fn update_state(&self, name: &JobName, mutate: impl FnOnce(&mut JobState)) {
        let mut states = self.states.write().await;
        let Some(state) = states.get_mut(name) else {
            return;
        };
        mutate(state);
        state.updated_at = now_ms();
        let snapshot = state.clone();
        drop(states);

        if let Err(e) = self.store.save_job_state(&snapshot).await {
            warn!(job = %name, error = %e, "failed to persist job state");
        }
    }
}
