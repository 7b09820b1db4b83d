//! Build validated core values from parsed configuration.

use std::collections::HashSet;

use chrono_tz::Tz;

use super::error::ConfigError;
use super::types::{ConfigFile, ExecutorConfig, JobConfig};
use crate::core::job::Job;

/// A fully validated configuration, ready to wire into the scheduler.
#[derive(Debug)]
pub struct BuiltConfig {
    /// Parsed timezone for window strategies.
    pub timezone: Tz,
    /// Optional deterministic seed.
    pub seed: Option<String>,
    /// SQLite database path.
    pub database: String,
    /// Validated executor settings.
    pub executor: ExecutorConfig,
    /// Validated jobs, in file order.
    pub jobs: Vec<Job>,
}

/// Validate a parsed config file and build the core values.
pub fn build(config: ConfigFile) -> Result<BuiltConfig, ConfigError> {
    let timezone: Tz = config
        .timezone
        .parse()
        .map_err(|_| ConfigError::InvalidTimezone(config.timezone.clone()))?;

    validate_executor(&config.executor)?;

    let mut names: HashSet<String> = HashSet::new();
    let mut jobs = Vec::with_capacity(config.jobs.len());
    for job_config in config.jobs {
        if !names.insert(job_config.name.clone()) {
            return Err(ConfigError::InvalidConfig(format!(
                "duplicate job name: {}",
                job_config.name
            )));
        }
        jobs.push(build_job(job_config)?);
    }

    Ok(BuiltConfig {
        timezone,
        seed: config.seed,
        database: config.database,
        executor: config.executor,
        jobs,
    })
}

fn build_job(config: JobConfig) -> Result<Job, ConfigError> {
    let name = config.name.clone();
    let mut job = Job::new(config.name, config.strategy, config.action)
        .with_enabled(config.enabled)
        .with_on_failure(config.on_failure);
    if let Some(retry) = config.retry {
        job = job.with_retry(retry);
    }
    if let Some(delivery) = config.delivery {
        job = job.with_delivery(delivery);
    }

    job.validate()
        .map_err(|source| ConfigError::InvalidJob { name, source })?;
    Ok(job)
}

fn validate_executor(executor: &ExecutorConfig) -> Result<(), ConfigError> {
    match executor {
        ExecutorConfig::Http { url, session_key } => {
            let lowered = url.to_ascii_lowercase();
            let local = url_host(&lowered)
                .map(|h| h == "localhost" || h == "127.0.0.1")
                .unwrap_or(false);
            if !lowered.starts_with("https://") && !local {
                return Err(ConfigError::InvalidConfig(format!(
                    "executor url must use HTTPS (localhost excepted): {}",
                    url
                )));
            }
            if session_key.len() < 8 {
                return Err(ConfigError::InvalidConfig(
                    "session_key must be at least 8 characters".to_string(),
                ));
            }
            Ok(())
        }
        ExecutorConfig::Process {
            trigger_dir,
            command,
            ..
        } => {
            if trigger_dir.is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "trigger_dir must not be empty".to_string(),
                ));
            }
            if command.is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "executor command must not be empty".to_string(),
                ));
            }
            Ok(())
        }
    }
}

/// Host part of a URL, without userinfo or port.
fn url_host(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    host.split(':').next()
}
