//! Shared error taxonomy.
//!
//! Each subsystem crate defines its own narrow error enum at its seam; this
//! crate defines the handful of error shapes that are genuinely shared across
//! subsystem boundaries (artefact/model validation, atomic-write failures),
//! plus the top-level `CoreError` that other crates' errors convert into via
//! `#[from]`: a per-crate error enum composed by a crate-spanning error
//! type.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("atomic write to {path} failed: {reason}")]
    AtomicWrite { path: PathBuf, reason: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid artefact: {reason}")]
    InvalidArtefact { reason: String },

    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
