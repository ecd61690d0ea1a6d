//! Per-stage and per-group execution metrics, and the derived JSON report.
//!
//! The orchestrator drives a [`MetricsCollector`] through one call per
//! lifecycle transition (`record_enqueue`, `record_start`, `record_finish`,
//! `record_meta_line`, `record_group_start`, `record_group_finish`); the
//! sink additionally calls `record_meta_line` for every `meta:` line it
//! classifies so per-stage meta counts are accurate even for lines emitted
//! well after the stage's own `run` returned.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use pr_core::atomic_write::write_atomic_str;
use pr_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Terminal status class for one stage run (Pipeline stage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Ok,
    Timeout,
    Missing,
    Error,
    Skipped,
    CacheReused,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StageRecord {
    group: Option<String>,
    enqueued_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    status: Option<StageStatus>,
    timeout_s: Option<u64>,
    inputs: u64,
    outputs: u64,
    meta_lines: u64,
    error_counts: BTreeMap<String, u64>,
    skip_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GroupRecord {
    concurrency_cap: usize,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

/// Accumulates stage/group lifecycle events for the duration of one run.
///
/// Internally mutex-guarded so it can be shared across concurrent stage
/// tasks within a group via `Arc<MetricsCollector>`.
#[derive(Default)]
pub struct MetricsCollector {
    stages: Mutex<BTreeMap<String, StageRecord>>,
    groups: Mutex<BTreeMap<String, GroupRecord>>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueue(&self, stage: &str, group: Option<&str>, timeout_s: u64) {
        let mut stages = self.stages.lock().expect("metrics mutex poisoned");
        let entry = stages.entry(stage.to_string()).or_default();
        entry.enqueued_at = Some(Utc::now());
        entry.group = group.map(str::to_string);
        entry.timeout_s = Some(timeout_s);
    }

    pub fn record_start(&self, stage: &str) {
        let mut stages = self.stages.lock().expect("metrics mutex poisoned");
        stages.entry(stage.to_string()).or_default().started_at = Some(Utc::now());
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_finish(
        &self,
        stage: &str,
        status: StageStatus,
        inputs: u64,
        outputs: u64,
        error_class: Option<&str>,
    ) {
        let mut stages = self.stages.lock().expect("metrics mutex poisoned");
        let entry = stages.entry(stage.to_string()).or_default();
        entry.ended_at = Some(Utc::now());
        entry.status = Some(status);
        entry.inputs = inputs;
        entry.outputs = outputs;
        if let Some(class) = error_class {
            *entry.error_counts.entry(class.to_string()).or_insert(0) += 1;
        }
    }

    pub fn record_skip(&self, stage: &str, reason: &str) {
        let mut stages = self.stages.lock().expect("metrics mutex poisoned");
        let entry = stages.entry(stage.to_string()).or_default();
        entry.status = Some(StageStatus::Skipped);
        entry.skip_reason = Some(reason.to_string());
    }

    pub fn record_meta_line(&self, stage: &str) {
        let mut stages = self.stages.lock().expect("metrics mutex poisoned");
        stages.entry(stage.to_string()).or_default().meta_lines += 1;
    }

    pub fn record_group_start(&self, group: &str, concurrency_cap: usize) {
        let mut groups = self.groups.lock().expect("metrics mutex poisoned");
        let entry = groups.entry(group.to_string()).or_default();
        entry.concurrency_cap = concurrency_cap;
        entry.started_at = Some(Utc::now());
    }

    pub fn record_group_finish(&self, group: &str) {
        let mut groups = self.groups.lock().expect("metrics mutex poisoned");
        groups.entry(group.to_string()).or_default().ended_at = Some(Utc::now());
    }

    /// Compute the derived report. Safe to call mid-run; stages without an
    /// `ended_at` yet are reported with a `null` duration.
    #[must_use]
    pub fn report(&self) -> MetricsReport {
        let stages = self.stages.lock().expect("metrics mutex poisoned");
        let groups = self.groups.lock().expect("metrics mutex poisoned");

        let mut stage_reports: Vec<StageReport> = Vec::with_capacity(stages.len());
        for (name, record) in stages.iter() {
            let queue_wait_ms = match (record.enqueued_at, record.started_at) {
                (Some(enq), Some(start)) => Some((start - enq).num_milliseconds().max(0) as u64),
                _ => None,
            };
            let duration_ms = match (record.started_at, record.ended_at) {
                (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
                _ => None,
            };
            stage_reports.push(StageReport {
                    name: name.clone(),
                    group: record.group.clone(),
                    status: record.status,
                    queue_wait_ms,
                    duration_ms,
                    timeout_s: record.timeout_s,
                    inputs: record.inputs,
                    outputs: record.outputs,
                    meta_lines: record.meta_lines,
                    error_counts: record.error_counts.clone(),
                    skip_reason: record.skip_reason.clone(),
                });
        }

        let group_reports: Vec<GroupReport> = groups
        .iter()
        .map(|(name, record)| GroupReport {
                name: name.clone(),
                concurrency_cap: record.concurrency_cap,
                wall_clock_ms: match (record.started_at, record.ended_at) {
                    (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
                    _ => None,
                },
            })
        .collect();

        let mut durations: Vec<u64> = stage_reports.iter().filter_map(|s| s.duration_ms).collect();
        durations.sort_unstable();
        let max_duration_ms = durations.last().copied();
        let p95_duration_ms = percentile(&durations, 0.95);
        let total_sequential_ms: u64 = durations.iter().sum();

        // Critical path: max of (duration + queue_wait) across all stages.
        let critical_path_ms = stage_reports
        .iter()
        .filter_map(|s| match (s.duration_ms, s.queue_wait_ms) {
                (Some(d), Some(q)) => Some(d + q),
                (Some(d), None) => Some(d),
                _ => None,
            })
        .max()
        .unwrap_or(0);

        let max_concurrency = group_reports.iter().map(|g| g.concurrency_cap).max().unwrap_or(1).max(1);
        let parallel_efficiency = if max_duration_ms.unwrap_or(0) > 0 {
            total_sequential_ms as f64 / (max_duration_ms.unwrap() as f64 * max_concurrency as f64)
        } else {
            0.0
        };

        let mut bottlenecks: Vec<(String, u64)> = stage_reports
        .iter()
        .filter_map(|s| s.duration_ms.map(|d| (s.name.clone(), d)))
        .collect();
        bottlenecks.sort_by(|a, b| b.1.cmp(&a.1));
        let top_bottlenecks: Vec<String> = bottlenecks.into_iter().take(5).map(|(name, _)| name).collect();

        MetricsReport {
            stages: stage_reports,
            groups: group_reports,
            p95_duration_ms,
            max_duration_ms,
            total_sequential_ms,
            critical_path_ms,
            parallel_efficiency,
            top_bottlenecks,
        }
    }
}

fn percentile(sorted: &[u64], p: f64) -> Option<u64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted.get(rank.min(sorted.len() - 1)).copied()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub name: String,
    pub group: Option<String>,
    pub status: Option<StageStatus>,
    pub queue_wait_ms: Option<u64>,
    pub duration_ms: Option<u64>,
    pub timeout_s: Option<u64>,
    pub inputs: u64,
    pub outputs: u64,
    pub meta_lines: u64,
    pub error_counts: BTreeMap<String, u64>,
    pub skip_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupReport {
    pub name: String,
    pub concurrency_cap: usize,
    pub wall_clock_ms: Option<u64>,
}

/// The report written to `<outdir>/<target>/metrics`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub stages: Vec<StageReport>,
    pub groups: Vec<GroupReport>,
    pub p95_duration_ms: Option<u64>,
    pub max_duration_ms: Option<u64>,
    pub total_sequential_ms: u64,
    pub critical_path_ms: u64,
    pub parallel_efficiency: f64,
    pub top_bottlenecks: Vec<String>,
}

impl MetricsReport {
    pub fn write_to(&self, path: &Path) -> CoreResult<()> {
        let text = serde_json::to_string_pretty(self).map_err(CoreError::Serde)?;
        write_atomic_str(path, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn queue_wait_and_duration_are_derived() {
        let collector = MetricsCollector::new();
        collector.record_enqueue("subfinder", Some("subdomain-sources"), 120);
        sleep(Duration::from_millis(5));
        collector.record_start("subfinder");
        sleep(Duration::from_millis(5));
        collector.record_finish("subfinder", StageStatus::Ok, 0, 42, None);

        let report = collector.report();
        let stage = report.stages.iter().find(|s| s.name == "subfinder").unwrap();
        assert!(stage.queue_wait_ms.unwrap() >= 1);
        assert!(stage.duration_ms.unwrap() >= 1);
        assert_eq!(stage.outputs, 42);
    }

    #[test]
    fn critical_path_is_lower_bound_of_pipeline_duration() {
        let collector = MetricsCollector::new();
        collector.record_enqueue("a", None, 120);
        collector.record_start("a");
        collector.record_finish("a", StageStatus::Ok, 0, 10, None);
        collector.record_enqueue("b", None, 120);
        collector.record_start("b");
        collector.record_finish("b", StageStatus::Ok, 0, 10, None);

        let report = collector.report();
        let pipeline_duration_ms = report.total_sequential_ms;
        assert!(pipeline_duration_ms >= report.critical_path_ms);
    }

    #[test]
    fn skipped_stage_has_reason_and_no_duration() {
        let collector = MetricsCollector::new();
        collector.record_skip("amass", "not requested");
        let report = collector.report();
        let stage = report.stages.iter().find(|s| s.name == "amass").unwrap();
        assert_eq!(stage.status, Some(StageStatus::Skipped));
        assert_eq!(stage.skip_reason.as_deref(), Some("not requested"));
        assert!(stage.duration_ms.is_none());
    }

    #[test]
    fn meta_lines_accumulate_independent_of_stage_finish() {
        let collector = MetricsCollector::new();
        collector.record_meta_line("httpx");
        collector.record_meta_line("httpx");
        let report = collector.report();
        let stage = report.stages.iter().find(|s| s.name == "httpx").unwrap();
        assert_eq!(stage.meta_lines, 2);
    }

    #[test]
    fn report_writes_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let collector = MetricsCollector::new();
        collector.record_enqueue("crtsh", None, 120);
        collector.record_start("crtsh");
        collector.record_finish("crtsh", StageStatus::Ok, 0, 5, None);
        let report = collector.report();
        let path = dir.path().join("metrics");
        report.write_to(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        serde_json::from_str::<serde_json::Value>(&text).unwrap();
    }
}
