//! Typed progress/observer hooks.
//!
//! Rather than injecting test fakes through mutable package-level function
//! variables, this workspace uses a small observer trait the orchestrator
//! is constructed with, so a caller (a TUI, a test) can observe stage
//! transitions without reaching for global state.

use pr_metrics::StageStatus;

/// Observes stage lifecycle transitions as the pipeline runs. All methods
/// have a no-op default; implementors only override what they care about.
pub trait ProgressRecorder: Send + Sync {
    fn stage_started(&self, _stage: &str) {}
    fn stage_finished(&self, _stage: &str, _status: StageStatus) {}
    fn stage_skipped(&self, _stage: &str, _reason: &str) {}
}

/// The default: observes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressRecorder;

impl ProgressRecorder for NoopProgressRecorder {}

/// Emits one `tracing` event per transition: the non-TTY / test-friendly
/// recorder; a real interactive progress bar is a visual concern outside
/// this workspace's scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineProgressRecorder;

impl ProgressRecorder for LineProgressRecorder {
    fn stage_started(&self, stage: &str) {
        tracing::info!(stage, "stage started");
    }

    fn stage_finished(&self, stage: &str, status: StageStatus) {
        tracing::info!(stage, ?status, "stage finished");
    }

    fn stage_skipped(&self, stage: &str, reason: &str) {
        tracing::info!(stage, reason, "stage skipped");
    }
}
