//! cadence - a randomized nudge scheduler for AI agents.
//!
//! Usage:
//!   cadence run <config>            Run the scheduler
//!   cadence validate <config>       Validate configuration without running
//!   cadence status <config>         Print job states from the store
//!   cadence trigger <config> <job>  Fire one job immediately

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use cadence::config::{self, ExecutorConfig, YamlLoader};
use cadence::core::time::{now_ms, to_utc};
use cadence::{Executor, HttpExecutor, ProcessExecutor, Runner, Scheduler, SqliteStore, Store};

/// cadence - a randomized nudge scheduler for AI agents
#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler until Ctrl+C
    Run {
        /// Path to the YAML configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Validate the configuration without running
    Validate {
        /// Path to the YAML configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Print the persisted state of every job
    Status {
        /// Path to the YAML configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Fire a job once, immediately, through the runner
    Trigger {
        /// Path to the YAML configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Name of the job to fire
        #[arg(value_name = "JOB")]
        job: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run_scheduler(config).await?,
        Commands::Validate { config } => validate(config)?,
        Commands::Status { config } => status(config).await?,
        Commands::Trigger { config, job } => trigger(config, job).await?,
    }

    Ok(())
}

fn load(config_path: &PathBuf) -> Result<config::BuiltConfig, Box<dyn std::error::Error>> {
    Ok(config::build(YamlLoader::load(config_path)?)?)
}

fn make_executor(executor: &ExecutorConfig) -> Arc<dyn Executor> {
    match executor {
        ExecutorConfig::Http { url, session_key } => {
            Arc::new(HttpExecutor::new(url.clone(), session_key.clone()))
        }
        ExecutorConfig::Process {
            trigger_dir,
            command,
            args,
        } => Arc::new(ProcessExecutor::new(
            trigger_dir,
            command.clone(),
            args.clone(),
        )),
    }
}

/// Run the scheduler until interrupted.
async fn run_scheduler(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let built = load(&config_path)?;
    if built.jobs.is_empty() {
        warn!("no jobs configured in {}", config_path.display());
        return Ok(());
    }

    info!("loaded {} job(s):", built.jobs.len());
    for job in &built.jobs {
        let enabled = if job.is_enabled() { "" } else { " (disabled)" };
        info!("  - {} [{}]{}", job.name(), job.strategy().kind(), enabled);
    }

    let store = Arc::new(SqliteStore::open(&built.database).await?);
    let executor = make_executor(&built.executor);

    let mut scheduler = Scheduler::new(Arc::clone(&store), executor)
        .with_timezone(built.timezone)
        .with_seed(built.seed.clone());
    for job in built.jobs {
        scheduler.register(job);
    }

    scheduler.start().await?;
    info!("scheduler running, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutting down...");
    scheduler.stop().await;
    store.close().await?;
    Ok(())
}

/// Validate the configuration and report each job.
fn validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match load(&config_path) {
        Ok(built) => {
            println!("configuration OK: {} job(s)", built.jobs.len());
            for job in &built.jobs {
                println!(
                    "  - {} [{}]{}",
                    job.name(),
                    job.strategy().kind(),
                    if job.is_enabled() { "" } else { " (disabled)" }
                );
            }
            Ok(())
        }
        Err(e) => {
            error!("validation failed: {}", e);
            Err(e)
        }
    }
}

/// Print the persisted job states.
async fn status(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let built = load(&config_path)?;
    let store = SqliteStore::open(&built.database).await?;
    let states = store.get_all_job_states().await?;

    if states.is_empty() {
        println!("no job state recorded yet");
    }
    for state in states {
        let format = |ms: Option<i64>| {
            ms.map(|ms| to_utc(ms).to_rfc3339())
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "{}  enabled={}  next_run={}  last_run={}  fail_count={}",
            state.name,
            state.enabled,
            format(state.next_run),
            format(state.last_run),
            state.fail_count
        );
    }

    store.close().await?;
    Ok(())
}

/// Fire one job immediately and report the outcome.
async fn trigger(config_path: PathBuf, job_name: String) -> Result<(), Box<dyn std::error::Error>> {
    let built = load(&config_path)?;
    let Some(job) = built.jobs.iter().find(|j| j.name().as_str() == job_name) else {
        let known: Vec<&str> = built.jobs.iter().map(|j| j.name().as_str()).collect();
        error!("job '{}' not found; known jobs: {}", job_name, known.join(", "));
        return Err(format!("job '{}' not found", job_name).into());
    };

    let store = Arc::new(SqliteStore::open(&built.database).await?);
    let executor = make_executor(&built.executor);
    let runner = Runner::new(executor, Arc::clone(&store));

    info!("firing '{}'...", job_name);
    let result = runner.run(job, now_ms()).await;
    if result.is_success() {
        info!(
            "fire succeeded in {} ms ({} attempt(s))",
            result.duration_ms, result.attempts
        );
    } else {
        error!(
            "fire ended with status '{}' after {} attempt(s): {}",
            result.status.as_str(),
            result.attempts,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    store.close().await?;
    if result.is_success() {
        Ok(())
    } else {
        Err(format!("fire ended with status '{}'", result.status.as_str()).into())
    }
}
