//! passive-rec - a dependency-ordered passive/active web reconnaissance
//! pipeline: enumerate subdomains, cross-reference certificate transparency
//! and archive sources, dedupe, then optionally probe what's live.
//!
//! This crate is the thin wiring layer over the `pr-*` library crates: CLI
//! flag parsing, config loading, tracing setup, and the top-level error type
//! that maps a run's outcome to a process exit code. The pipeline itself
//! lives in `pr_orchestrator::Orchestrator`.

pub mod cli;
pub mod error;

pub use error::AppError;
