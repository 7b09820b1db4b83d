//! Execution: the executor contract, its two concrete shapes, and the
//! runner that drives a single fire through retries.

mod executor;
mod http;
mod process;
mod runner;

pub use executor::{Executor, ExecutorError, TriggerRequest, TriggerResponse};
pub use http::HttpExecutor;
pub use process::ProcessExecutor;
pub use runner::{RunResult, Runner};
