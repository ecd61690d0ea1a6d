//! Shared data model, error taxonomy, and ambient utilities for `passive-rec`.
//!
//! This crate has no knowledge of any particular pipeline stage; it only
//! defines the vocabulary (`Artefact`, `ArtefactType`, `ArtefactKey`) and the
//! small cross-cutting helpers (atomic writes, tracing init, SHA-256) that
//! every other crate in the workspace builds on.

pub mod atomic_write;
pub mod cancel;
pub mod error;
pub mod hashing;
pub mod logging;
pub mod model;

pub use cancel::CancellationToken;
pub use error::{CoreError, CoreResult};
pub use model::{Artefact, ArtefactKey, ArtefactType};
