//! cadence - a randomized scheduler for AI-agent nudges.
//!
//! Jobs fire on human-paced, intentionally randomized schedules instead
//! of clockwork cron ticks. Each job pairs a strategy (window, interval,
//! or probabilistic) with an action delivered to an external agent
//! runtime through an executor; outcomes and schedule state persist in
//! SQLite so the cadence survives restarts.

pub mod config;
pub mod core;
pub mod execution;
pub mod scheduler;
pub mod storage;
pub mod strategy;
pub mod testing;

pub use crate::core::job::{Action, Delivery, Distribution, Job, JobError, OnFailure, StrategyConfig};
pub use crate::core::retry::{Backoff, RetryPolicy};
pub use crate::core::rng::Rng;
pub use crate::core::types::{JobName, Priority};

pub use config::{BuiltConfig, ConfigError, ConfigFile, ExecutorConfig, YamlLoader};

pub use execution::{
    Executor, ExecutorError, HttpExecutor, ProcessExecutor, RunResult, Runner, TriggerRequest,
    TriggerResponse,
};

pub use scheduler::{JobStatus, Scheduler, SchedulerError};

pub use storage::{
    InMemoryStore, JobState, RunRecord, RunStatus, SqliteStore, StorageError, Store,
};

pub use strategy::{IntervalStrategy, ProbabilisticStrategy, Strategy, WindowStrategy};
