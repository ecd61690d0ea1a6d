//! Runner error taxonomy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    /// Sentinel, distinguishable from every other failure mode: the
    /// orchestrator maps this to stage status `missing` rather than
    /// `error`.
    #[error("binary not found on PATH: {program}")]
    MissingBinary { program: String },

    #[error("failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error reading output of {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    #[must_use]
    pub fn is_missing_binary(&self) -> bool {
        matches!(self, RunnerError::MissingBinary {.. })
    }

    pub fn from_spawn_error(program: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            RunnerError::MissingBinary {
                program: program.to_string(),
            }
        } else {
            RunnerError::SpawnFailed {
                program: program.to_string(),
                source,
            }
        }
    }
}
