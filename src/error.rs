//! Top-level error type the binary maps to a process exit code.
//!
//! Every subsystem error composes in via `#[from]`, and `exit_code()` is
//! the single place that decides what the process reports to the shell.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] pr_config::ConfigError),

    #[error("failed to initialise logging: {0}")]
    Logging(String),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error(transparent)]
    Orchestrator(#[from] pr_orchestrator::OrchestratorError),
}

impl AppError {
    /// 0 success is handled by the caller; everything else lands here.
    /// Config/runtime/logging failures happen before the pipeline ever
    /// starts, so they get the setup exit code; a materialiser or manifest
    /// failure inside the orchestrator is the only fatal in-pipeline error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Logging(_) | AppError::Runtime(_) => 2,
            AppError::Orchestrator(_) => 1,
        }
    }
}
