//! Adapter error taxonomy.

use pr_runner::RunnerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    /// Sentinel distinguishable from every other failure mode; the
    /// orchestrator maps this to stage status `missing` instead of `error`.
    #[error("binary not found on PATH: {0}")]
    MissingBinary(String),

    #[error("{tool} process failed: {source}")]
    Process {
        tool: String,
        #[source]
        source: RunnerError,
    },

    #[error("{tool} credentials not configured")]
    MissingCredentials { tool: String },

    #[error("{tool} request failed: {detail}")]
    Request { tool: String, detail: String },

    #[error("failed to read manifest {path}: {source}")]
    ManifestRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AdapterError {
    #[must_use]
    pub fn is_missing_binary(&self) -> bool {
        matches!(self, AdapterError::MissingBinary(_))
    }

    pub(crate) fn from_runner(tool: &str, source: RunnerError) -> Self {
        if source.is_missing_binary() {
            AdapterError::MissingBinary(tool.to_string())
        } else {
            AdapterError::Process {
                tool: tool.to_string(),
                source,
            }
        }
    }
}
