//! In-memory store implementation.
//!
//! Backs tests and the one-shot CLI paths; nothing survives the process.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::RwLock;

use super::{JobState, RunRecord, StorageError, Store};
use crate::core::types::JobName;

/// In-memory store backend.
pub struct InMemoryStore {
    states: RwLock<HashMap<JobName, JobState>>,
    runs: RwLock<Vec<RunRecord>>,
    next_run_id: AtomicI64,
    closed: AtomicBool,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            runs: RwLock::new(Vec::new()),
            next_run_id: AtomicI64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    fn check_open(&self) -> Result<(), StorageError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn save_job_state(&self, state: &JobState) -> Result<(), StorageError> {
        self.check_open()?;
        let mut states = self
            .states
            .write()
            .map_err(|_| StorageError::Other("state lock poisoned".to_string()))?;
        states.insert(state.name.clone(), state.clone());
        Ok(())
    }

    async fn get_job_state(&self, name: &JobName) -> Result<Option<JobState>, StorageError> {
        self.check_open()?;
        let states = self
            .states
            .read()
            .map_err(|_| StorageError::Other("state lock poisoned".to_string()))?;
        Ok(states.get(name).cloned())
    }

    async fn get_all_job_states(&self) -> Result<Vec<JobState>, StorageError> {
        self.check_open()?;
        let states = self
            .states
            .read()
            .map_err(|_| StorageError::Other("state lock poisoned".to_string()))?;
        let mut result: Vec<_> = states.values().cloned().collect();
        result.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        Ok(result)
    }

    async fn record_run(&self, mut record: RunRecord) -> Result<i64, StorageError> {
        self.check_open()?;
        let id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        record.id = Some(id);
        let mut runs = self
            .runs
            .write()
            .map_err(|_| StorageError::Other("run lock poisoned".to_string()))?;
        runs.push(record);
        Ok(id)
    }

    async fn get_recent_runs(
        &self,
        name: &JobName,
        limit: usize,
    ) -> Result<Vec<RunRecord>, StorageError> {
        self.check_open()?;
        let runs = self
            .runs
            .read()
            .map_err(|_| StorageError::Other("run lock poisoned".to_string()))?;
        let mut result: Vec<_> = runs
            .iter()
            .filter(|r| &r.job_name == name)
            .cloned()
            .collect();
        // Newest first; ties resolved by append order via the id.
        result.sort_by(|a, b| (b.triggered_at, b.id).cmp(&(a.triggered_at, a.id)));
        result.truncate(limit);
        Ok(result)
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
