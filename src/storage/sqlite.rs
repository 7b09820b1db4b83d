//! SQLite store implementation.
//!
//! Persistent backend using SQLite with automatic schema migration.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use super::{
    decode_response, encode_response, JobState, RunRecord, RunStatus, StorageError, Store,
};
use crate::core::types::JobName;

/// SQLite store backend.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and run
    /// migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path_str = path.as_ref().to_string_lossy();
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path_str))
            .map_err(|e| StorageError::Other(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (useful for testing).
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Other(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        let schema = include_str!("../../migrations/001_initial_schema.sql");
        sqlx::raw_sql(schema)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Other(format!("migration failed: {}", e)))?;
        Ok(())
    }
}

fn map_sqlx(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::PoolClosed => StorageError::Closed,
        other => StorageError::Other(other.to_string()),
    }
}

fn u32_column(raw: i64, column: &str) -> Result<u32, StorageError> {
    u32::try_from(raw)
        .map_err(|_| StorageError::Corrupt(format!("negative {} column: {}", column, raw)))
}

type StateRow = (String, Option<i64>, Option<i64>, bool, i64, i64, i64);

fn state_from_row(row: StateRow) -> Result<JobState, StorageError> {
    Ok(JobState {
        name: JobName::new(row.0),
        next_run: row.1,
        last_run: row.2,
        enabled: row.3,
        fail_count: u32_column(row.4, "fail_count")?,
        created_at: row.5,
        updated_at: row.6,
    })
}

type RunRow = (
    i64,
    String,
    i64,
    i64,
    i64,
    i64,
    String,
    Option<String>,
    Option<String>,
    i64,
);

fn run_from_row(row: RunRow) -> Result<RunRecord, StorageError> {
    Ok(RunRecord {
        id: Some(row.0),
        job_name: JobName::new(row.1),
        scheduled_at: row.2,
        triggered_at: row.3,
        completed_at: row.4,
        duration_ms: row.5,
        status: RunStatus::parse(&row.6)?,
        response: row.7.as_deref().map(decode_response),
        error: row.8,
        attempts: u32_column(row.9, "attempts")?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn save_job_state(&self, state: &JobState) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (name, next_run, last_run, enabled, fail_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                next_run = excluded.next_run,
                last_run = excluded.last_run,
                enabled = excluded.enabled,
                fail_count = excluded.fail_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(state.name.as_str())
        .bind(state.next_run)
        .bind(state.last_run)
        .bind(state.enabled)
        .bind(state.fail_count as i64)
        .bind(state.created_at)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn get_job_state(&self, name: &JobName) -> Result<Option<JobState>, StorageError> {
        let row: Option<StateRow> = sqlx::query_as(
            "SELECT name, next_run, last_run, enabled, fail_count, created_at, updated_at
             FROM jobs WHERE name = ?",
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(state_from_row).transpose()
    }

    async fn get_all_job_states(&self) -> Result<Vec<JobState>, StorageError> {
        let rows: Vec<StateRow> = sqlx::query_as(
            "SELECT name, next_run, last_run, enabled, fail_count, created_at, updated_at
             FROM jobs ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(state_from_row).collect()
    }

    async fn record_run(&self, record: RunRecord) -> Result<i64, StorageError> {
        let response = record
            .response
            .as_ref()
            .map(encode_response)
            .transpose()?;

        let result = sqlx::query(
            r#"
            INSERT INTO runs (job_name, scheduled_at, triggered_at, completed_at,
                              duration_ms, status, response, error, attempts)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.job_name.as_str())
        .bind(record.scheduled_at)
        .bind(record.triggered_at)
        .bind(record.completed_at)
        .bind(record.duration_ms)
        .bind(record.status.as_str())
        .bind(response)
        .bind(&record.error)
        .bind(record.attempts as i64)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(result.last_insert_rowid())
    }

    async fn get_recent_runs(
        &self,
        name: &JobName,
        limit: usize,
    ) -> Result<Vec<RunRecord>, StorageError> {
        let rows: Vec<RunRow> = sqlx::query_as(
            "SELECT id, job_name, scheduled_at, triggered_at, completed_at,
                    duration_ms, status, response, error, attempts
             FROM runs WHERE job_name = ?
             ORDER BY triggered_at DESC, id DESC LIMIT ?",
        )
        .bind(name.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(run_from_row).collect()
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.pool.close().await;
        Ok(())
    }
}
