//! Resumable checkpoint
//!
//! Accepted on resume only if the loaded `target` and `run_hash` match the
//! current run; otherwise a fresh checkpoint is started in its place.
//! Removed on successful run completion, retained on abnormal exit
//!

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use pr_core::atomic_write::write_atomic_str;
use pr_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckpointFile {
    target: String,
    run_hash: String,
    completed_tools: BTreeSet<String>,
    timestamp: DateTime<Utc>,
}

impl CheckpointFile {
    fn fresh(target: &str, run_hash: &str) -> Self {
        Self {
            target: target.to_string(),
            run_hash: run_hash.to_string(),
            completed_tools: BTreeSet::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Transient, auto-saved progress for the in-flight run.
pub struct Checkpoint {
    path: PathBuf,
    state: Mutex<CheckpointFile>,
    auto_save: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Checkpoint {
    /// Load `path` and accept it only if its `target`/`run_hash` match the
    /// current run; otherwise start fresh.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>, target: &str, run_hash: &str) -> Self {
        let path = path.into();
        let loaded = std::fs::read_to_string(&path)
        .ok()
        .and_then(|text| serde_json::from_str::<CheckpointFile>(&text).ok());
        let state = match loaded {
            Some(cp) if cp.target == target && cp.run_hash == run_hash => cp,
            _ => CheckpointFile::fresh(target, run_hash),
        };
        Self {
            path,
            state: Mutex::new(state),
            auto_save: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn is_tool_completed(&self, tool: &str) -> bool {
        self.state.lock().expect("checkpoint mutex poisoned").completed_tools.contains(tool)
    }

    pub fn mark_tool_completed(&self, tool: &str) {
        let mut state = self.state.lock().expect("checkpoint mutex poisoned");
        state.completed_tools.insert(tool.to_string());
        state.timestamp = Utc::now();
    }

    pub fn save(&self) -> CoreResult<()> {
        let state = self.state.lock().expect("checkpoint mutex poisoned");
        let text = serde_json::to_string_pretty(&*state).map_err(CoreError::Serde)?;
        write_atomic_str(&self.path, &text)
    }

    /// Delete the checkpoint file. Idempotent: a missing file is not an
    /// error.
    pub fn remove(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Spawn a background task that calls [`Checkpoint::save`] every
    /// `interval`. Requires `self` behind an `Arc` since the task outlives
    /// this call.
    pub fn start_auto_save(self: &Arc<Self>, interval: Duration) {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if let Err(err) = this.save() {
                        tracing::warn!(error = %err, "checkpoint auto-save failed");
                    }
                }
            });
        *self.auto_save.lock().expect("checkpoint mutex poisoned") = Some(handle);
    }

    pub fn stop_auto_save(&self) {
        if let Some(handle) = self.auto_save.lock().expect("checkpoint mutex poisoned").take() {
            handle.abort();
        }
    }
}
