//! Async process execution primitive
//!
//! Adapters hand this crate a [`CommandSpec`]; it spawns the binary,
//! streams stdout/stderr line-by-line onto a channel with a bounded
//! scanner, and honours a [`pr_core::CancellationToken`] for stage
//! deadlines and Ctrl-C. A missing binary surfaces as
//! [`RunnerError::MissingBinary`] rather than a generic spawn failure so
//! the orchestrator can record the stage as `missing` instead of `error`.

mod command_spec;
mod error;
mod process;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use process::{spawn_streaming, spawn_streaming_with_input, ExitStatusInfo, MAX_LINE_BYTES};
