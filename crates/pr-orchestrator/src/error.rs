//! Orchestrator error taxonomy.
//!
//! Per the error-handling policy, almost nothing here is fatal to a run: a
//! single stage failing never aborts the pipeline. [`OrchestratorError`] only
//! covers the pre-pipeline setup and post-pipeline materialisation failures
//! that the policy does treat as fatal.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("materialisation failed: {0}")]
    Materialize(#[from] pr_materialize::MaterializeError),

    #[error(transparent)]
    Core(#[from] pr_core::CoreError),
}
