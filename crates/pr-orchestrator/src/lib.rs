//! Pipeline driver.
//!
//! [`Orchestrator::run_with_cancel`] is the one long function in this
//! workspace: it walks the declared stage table in
//! [`stages::build_phases`] order, running each phase's stages
//! concurrently under a semaphore, consulting the execution cache and
//! checkpoint before doing any real work, and feeding every line a stage
//! produces into the shared [`pr_sink::Sink`]. Everything it needs to do
//! that (selection, adaptive timeouts, observer hooks) lives in the
//! sibling modules; this file is the contract between them.

mod error;
mod progress;
pub mod stages;
mod timeout;

pub use error::OrchestratorError;
pub use progress::{LineProgressRecorder, NoopProgressRecorder, ProgressRecorder};
pub use stages::{Phase, Selection, StageDef, PIPELINE};
pub use timeout::{compute as compute_timeout, parse_group_concurrency_env};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use camino::Utf8PathBuf;
use pr_adapters::{AdapterContext, AdapterRegistry, ToolAdapter};
use pr_cache::{run_hash, Checkpoint, ExecutionCache};
use pr_config::{Config, ScopeMode};
use pr_core::CancellationToken;
use pr_dedupe::Dedupe;
use pr_metrics::{MetricsCollector, MetricsReport, StageStatus};
use pr_scope::TargetScope;
use pr_sink::Sink;
use tokio::sync::Semaphore;

/// How old a cache entry may be before the orchestrator treats it as cold,
/// regardless of hash match.
const CACHE_MAX_AGE_HOURS: i64 = 24;
const CHECKPOINT_AUTO_SAVE: std::time::Duration = std::time::Duration::from_secs(30);

/// The outcome of one completed run, handed back to whatever embeds the
/// orchestrator (the `passive-rec` binary, a test).
#[derive(Debug, Clone)]
pub struct RunReport {
    pub target_dir: Utf8PathBuf,
    pub manifest_path: Utf8PathBuf,
    pub run_hash: String,
    pub artefact_count: usize,
    pub metrics: MetricsReport,
    pub unknown_tools: Vec<String>,
}

/// Drives one reconnaissance run end to end over a fixed [`Config`].
///
/// Construct with [`Orchestrator::new`], optionally swap in a fake adapter
/// registry or a progress recorder for a test, then call [`Orchestrator::run`]
/// or [`Orchestrator::run_with_cancel`] for a caller-supplied cancellation
/// token (graceful SIGINT handling composes with this).
pub struct Orchestrator {
    config: Config,
    registry: AdapterRegistry,
    progress: Arc<dyn ProgressRecorder>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: AdapterRegistry::production(),
            progress: Arc::new(NoopProgressRecorder),
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressRecorder>) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(&self) -> Result<RunReport, OrchestratorError> {
        self.run_with_cancel(CancellationToken::new()).await
    }

    /// Drive the full pipeline: scope-mode short-circuit, the declared
    /// stage table under per-group concurrency, adaptive timeouts, cache
    /// and checkpoint bookkeeping, materialisation, and a final flush.
    ///
    /// In dry-run mode (`cfg.dry_run`), every selected stage is reported
    /// as skipped with the timeout and reason it would have run under,
    /// without invoking any adapter.
    pub async fn run_with_cancel(&self, cancel: CancellationToken) -> Result<RunReport, OrchestratorError> {
        let cfg = &self.config;
        let target_dir = cfg.out_dir.join(cfg.sanitised_target_dir());
        std::fs::create_dir_all(target_dir.as_std_path()).map_err(|source| OrchestratorError::OutputDir {
            path: target_dir.clone().into_std_path_buf(),
            source,
        })?;
        let manifest_path = target_dir.join("artifacts.jsonl");

        let selection = stages::select(&cfg.tools);
        let run_hash_value = run_hash(cfg, &selection.ordered);

        let cache = Arc::new(StdMutex::new(ExecutionCache::load(
            target_dir.join(".passive-cache.json").into_std_path_buf(),
        )));
        let checkpoint = Arc::new(Checkpoint::load(
            target_dir.join(".checkpoint.json").into_std_path_buf(),
            &cfg.target,
            &run_hash_value,
        ));
        checkpoint.start_auto_save(CHECKPOINT_AUTO_SAVE);

        let scope = TargetScope::new(&cfg.target);
        let sink = Arc::new(Sink::new(manifest_path.clone().into_std_path_buf(), scope, Dedupe::new()));
        sink.start(cfg.workers);
        let metrics = Arc::new(MetricsCollector::new());
        sink.set_step_recorder(Arc::clone(&metrics));

        if cfg.scope_mode == ScopeMode::Domain {
            let injector = sink.in_();
            let _ = injector.send(cfg.target.clone()).await;
        }

        let group_overrides = std::env::var("ORCHESTRATOR_GROUP_CONCURRENCY")
            .ok()
            .map(|raw| parse_group_concurrency_env(&raw))
            .unwrap_or_default();

        let domains_dirty = Arc::new(AtomicBool::new(false));
        let deduped_domains: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));

        let phases = stages::build_phases(&selection.ordered);
        for phase in &phases {
            run_phase(
                phase,
                self,
                &target_dir,
                &manifest_path,
                &sink,
                &metrics,
                &checkpoint,
                &cache,
                &run_hash_value,
                &cancel,
                &domains_dirty,
                &deduped_domains,
                &group_overrides,
            )
            .await;
        }

        for unknown in &selection.unknown {
            emit_meta(&sink, "unknown", &format!("unknown tool: {unknown}")).await;
            self.progress.stage_skipped(unknown, "desconocido");
        }

        sink.flush().await?;
        let materialize_result = pr_materialize::materialize(target_dir.as_std_path());
        sink.close().await?;

        checkpoint.stop_auto_save();
        if let Err(err) = cache.lock().expect("cache mutex poisoned").save() {
            tracing::warn!(error = %err, "execution cache save failed");
        }

        let report = metrics.report();
        if let Err(err) = report.write_to(target_dir.join("metrics").as_std_path()) {
            tracing::warn!(error = %err, "metrics report write failed");
        }

        let materialize_report = materialize_result?;
        tracing::info!(files_written = materialize_report.files_written, "materialisation complete");

        if let Err(err) = checkpoint.remove() {
            tracing::warn!(error = %err, "checkpoint removal failed after successful run");
        }

        Ok(RunReport {
            target_dir,
            manifest_path,
            run_hash: run_hash_value,
            artefact_count: sink.artefact_count(),
            metrics: report,
            unknown_tools: selection.unknown,
        })
    }
}

async fn emit_meta(sink: &Sink, tool: &str, message: &str) {
    let (tx, cleanup) = sink.in_with_tool(tool);
    let _ = tx.send(format!("meta: {message}")).await;
    drop(tx);
    cleanup.finish().await;
}

async fn skip_stage(
    sink: &Sink,
    metrics: &MetricsCollector,
    progress: &Arc<dyn ProgressRecorder>,
    name: &str,
    group: Option<&str>,
    reason: &str,
) {
    metrics.record_enqueue(name, group, 0);
    metrics.record_skip(name, reason);
    progress.stage_skipped(name, reason);
    emit_meta(sink, name, &format!("{name} skipped: {reason}")).await;
}

fn rehydrate_deduped_domains(target_dir: &Utf8PathBuf, deduped_domains: &StdMutex<Vec<String>>) {
    let path = target_dir.join("domains").join("domains.dedupe");
    if let Ok(text) = std::fs::read_to_string(path.as_std_path()) {
        let domains: Vec<String> = text.lines().map(str::to_string).filter(|l| !l.is_empty()).collect();
        *deduped_domains.lock().expect("domains mutex poisoned") = domains;
    }
}

/// Stage-specific preconditions beyond the generic active/scope/cache
/// checks: credentials for `censys`, a non-empty deduped-domain list for
/// the archive/resolution stages, and at least one live route for `subjs`.
fn unmet_precondition(
    stage: &StageDef,
    cfg: &Config,
    manifest_path: &Utf8PathBuf,
    deduped_domains: &StdMutex<Vec<String>>,
) -> Option<String> {
    match stage.name {
        "censys" if !cfg.has_credentials_for("censys") => Some("censys credentials not configured".to_string()),
        "dnsx" | "waybackurls" | "gau" => {
            let empty = deduped_domains.lock().expect("domains mutex poisoned").is_empty();
            if empty {
                Some("no deduped domains available".to_string())
            } else {
                None
            }
        }
        "subjs" => match pr_adapters::live_active_routes(manifest_path.as_path()) {
            Ok(routes) if routes.is_empty() => Some("no live active routes".to_string()),
            Ok(_) => None,
            Err(err) => Some(format!("precondition check failed: {err}")),
        },
        _ => None,
    }
}

fn collect_domains(manifest_path: &std::path::Path) -> Vec<String> {
    let Ok(text) = std::fs::read_to_string(manifest_path) else {
        return Vec::new();
    };
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(artefact) = serde_json::from_str::<pr_core::Artefact>(line) else {
            continue;
        };
        if artefact.kind == pr_core::ArtefactType::Domain && seen.insert(artefact.value.clone()) {
            out.push(artefact.value);
        }
    }
    out
}

/// The internal `dedupe` stage: not an external adapter, just a sort+unique
/// pass over every domain artefact the manifest holds so far, written to
/// `domains/domains.dedupe` for downstream stages and adapters to read.
async fn run_dedupe_stage(
    sink: &Sink,
    target_dir: &Utf8PathBuf,
    deduped_domains: &StdMutex<Vec<String>>,
) -> Result<usize, pr_core::CoreError> {
    sink.flush().await?;
    let manifest_path = sink.manifest_path();
    let mut domains = collect_domains(&manifest_path);
    domains.sort();
    domains.dedup();

    let dir = target_dir.join("domains");
    std::fs::create_dir_all(dir.as_std_path()).map_err(|source| pr_core::CoreError::Io {
        path: dir.clone().into_std_path_buf(),
        source,
    })?;
    let path = dir.join("domains.dedupe");
    let mut content = String::new();
    for d in &domains {
        content.push_str(d);
        content.push('\n');
    }
    pr_core::atomic_write::write_atomic_str(path.as_std_path(), &content)?;

    let count = domains.len();
    *deduped_domains.lock().expect("domains mutex poisoned") = domains;
    Ok(count)
}

#[allow(clippy::too_many_arguments)]
async fn run_phase(
    phase: &Phase,
    orchestrator: &Orchestrator,
    target_dir: &Utf8PathBuf,
    manifest_path: &Utf8PathBuf,
    sink: &Arc<Sink>,
    metrics: &Arc<MetricsCollector>,
    checkpoint: &Arc<Checkpoint>,
    cache: &Arc<StdMutex<ExecutionCache>>,
    run_hash_value: &str,
    cancel: &CancellationToken,
    domains_dirty: &Arc<AtomicBool>,
    deduped_domains: &Arc<StdMutex<Vec<String>>>,
    group_overrides: &BTreeMap<String, usize>,
) {
    // Stages that read the manifest off disk depend on every upstream write
    // already being on it.
    if phase.stages.iter().any(|s| matches!(s.name, "dedupe" | "subjs" | "linkfinderevo")) {
        let _ = sink.flush().await;
    }

    let permits = timeout::group_concurrency(phase.group, phase.stages.len(), group_overrides);
    let semaphore = Arc::new(Semaphore::new(permits));
    if let Some(group) = phase.group {
        metrics.record_group_start(group, permits);
    }

    let mut handles = Vec::with_capacity(phase.stages.len());
    for stage in &phase.stages {
        let stage = *stage;
        let semaphore = Arc::clone(&semaphore);
        let cfg = orchestrator.config.clone();
        let target_dir = target_dir.clone();
        let manifest_path = manifest_path.clone();
        let sink = Arc::clone(sink);
        let metrics = Arc::clone(metrics);
        let checkpoint = Arc::clone(checkpoint);
        let cache = Arc::clone(cache);
        let run_hash_value = run_hash_value.to_string();
        let cancel = cancel.clone();
        let domains_dirty = Arc::clone(domains_dirty);
        let deduped_domains = Arc::clone(deduped_domains);
        let registry = orchestrator.registry.clone();
        let progress = Arc::clone(&orchestrator.progress);
        let group = phase.group;

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await;
            execute_stage(
                stage,
                &cfg,
                &target_dir,
                &manifest_path,
                &sink,
                &metrics,
                &checkpoint,
                &cache,
                &run_hash_value,
                &cancel,
                &domains_dirty,
                &deduped_domains,
                &registry,
                &progress,
                group,
            )
            .await;
        }));
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "stage task panicked");
        }
    }

    if let Some(group) = phase.group {
        metrics.record_group_finish(group);
    }
}

#[allow(clippy::too_many_arguments)]
async fn execute_stage(
    stage: &'static StageDef,
    cfg: &Config,
    target_dir: &Utf8PathBuf,
    manifest_path: &Utf8PathBuf,
    sink: &Arc<Sink>,
    metrics: &Arc<MetricsCollector>,
    checkpoint: &Arc<Checkpoint>,
    cache: &Arc<StdMutex<ExecutionCache>>,
    run_hash_value: &str,
    cancel: &CancellationToken,
    domains_dirty: &Arc<AtomicBool>,
    deduped_domains: &Arc<StdMutex<Vec<String>>>,
    registry: &AdapterRegistry,
    progress: &Arc<dyn ProgressRecorder>,
    group: Option<&'static str>,
) {
    let name = stage.name;

    if stage.active_only && !cfg.active {
        skip_stage(sink, metrics, progress, name, group, "active mode is off").await;
        return;
    }

    if let Some(reason) = unmet_precondition(stage, cfg, manifest_path, deduped_domains) {
        skip_stage(sink, metrics, progress, name, group, &reason).await;
        return;
    }

    if cfg.scope_mode == ScopeMode::Domain && stages::SCOPE_DOMAIN_SKIP.contains(&name) {
        skip_stage(sink, metrics, progress, name, group, "scope=domain excludes subdomain enumeration").await;
        return;
    }

    if checkpoint.is_tool_completed(name) {
        if name == "dedupe" {
            rehydrate_deduped_domains(target_dir, deduped_domains);
        }
        skip_stage(sink, metrics, progress, name, group, "already completed (checkpoint)").await;
        return;
    }

    let domain_count = deduped_domains.lock().expect("domains mutex poisoned").len();
    let timeout_s = compute_timeout(cfg, name, domain_count);

    // `dedupe` must not reuse its cache entry if a domain-producing stage
    // actually ran this session, even if the cache entry itself isn't stale.
    let cache_eligible = name != "dedupe" || !domains_dirty.load(Ordering::SeqCst);
    if cfg.dry_run {
        let reason = format!("dry-run: would execute (timeout {timeout_s}s)");
        skip_stage(sink, metrics, progress, name, group, &reason).await;
        return;
    }

    let (cache_hit, completed_at) = if cache_eligible {
        cache.lock().expect("cache mutex poisoned").should_skip(name, run_hash_value, chrono::Duration::hours(CACHE_MAX_AGE_HOURS))
    } else {
        (false, None)
    };
    if cache_hit {
        if name == "dedupe" {
            rehydrate_deduped_domains(target_dir, deduped_domains);
        }
        let age_days = completed_at.map(|ts| (chrono::Utc::now() - ts).num_days()).unwrap_or(0);
        metrics.record_enqueue(name, group, timeout_s);
        metrics.record_finish(name, StageStatus::CacheReused, 0, 0, None);
        progress.stage_skipped(name, "cache-reused");
        emit_meta(sink, name, &format!("{name} reutilizado desde cache (edad {age_days})")).await;
        return;
    }

    metrics.record_enqueue(name, group, timeout_s);
    metrics.record_start(name);
    progress.stage_started(name);

    if name == "dedupe" {
        match run_dedupe_stage(sink, target_dir, deduped_domains).await {
            Ok(count) => {
                domains_dirty.store(false, Ordering::SeqCst);
                checkpoint.mark_tool_completed(name);
                cache.lock().expect("cache mutex poisoned").mark_complete(name, run_hash_value);
                metrics.record_finish(name, StageStatus::Ok, 0, count as u64, None);
                progress.stage_finished(name, StageStatus::Ok);
            }
            Err(err) => {
                tracing::warn!(stage = name, error = %err, "dedupe stage failed");
                emit_meta(sink, name, &format!("{name} failed: {err}")).await;
                metrics.record_finish(name, StageStatus::Error, 0, 0, Some("io"));
                progress.stage_finished(name, StageStatus::Error);
            }
        }
        return;
    }

    let Some(adapter) = registry.get(name) else {
        emit_meta(sink, name, &format!("{name}: missing binary")).await;
        metrics.record_finish(name, StageStatus::Missing, 0, 0, None);
        progress.stage_finished(name, StageStatus::Missing);
        return;
    };

    let mut ctx = AdapterContext::new(cfg.target.clone(), manifest_path.clone())
        .with_domains(deduped_domains.lock().expect("domains mutex poisoned").clone())
        .with_active(cfg.active);
    ctx.proxy = cfg.proxy.clone();
    ctx.credentials = cfg.credentials.clone();
    ctx.workers = cfg.workers;

    let stage_cancel = cancel.child();
    let timeout_cancel = stage_cancel.clone();
    let (tx, cleanup) = sink.in_with_tool(name);

    let before_count = sink.artefact_count();
    let task = tokio::spawn(async move { adapter.run(&ctx, &stage_cancel, tx).await });

    let (status, meta_line, error_class) = match tokio::time::timeout(std::time::Duration::from_secs(timeout_s), task).await {
        Err(_elapsed) => {
            timeout_cancel.cancel();
            (StageStatus::Timeout, Some(format!("{name} timed out after {timeout_s}s")), Some("timeout"))
        }
        Ok(Err(_join_err)) => (StageStatus::Error, Some(format!("{name} failed: stage task panicked")), Some("panic")),
        Ok(Ok(Err(adapter_err))) => {
            if adapter_err.is_missing_binary() {
                (StageStatus::Missing, Some(format!("{name}: missing binary")), None)
            } else {
                (StageStatus::Error, Some(format!("{name} failed: {adapter_err}")), Some("adapter"))
            }
        }
        Ok(Ok(Ok(()))) => (StageStatus::Ok, None, None),
    };

    cleanup.finish().await;
    if let Some(line) = &meta_line {
        emit_meta(sink, name, line).await;
    }
    let _ = sink.flush().await;
    let outputs = sink.artefact_count().saturating_sub(before_count) as u64;

    if status == StageStatus::Ok {
        checkpoint.mark_tool_completed(name);
        cache.lock().expect("cache mutex poisoned").mark_complete(name, run_hash_value);
        if stage.produces_domains {
            domains_dirty.store(true, Ordering::SeqCst);
        }
    }

    metrics.record_finish(name, status, domain_count as u64, outputs, error_class);
    progress.stage_finished(name, status);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config::new("example.com", "/tmp")
    }

    #[test]
    fn orchestrator_constructs_with_production_registry_by_default() {
        let orchestrator = Orchestrator::new(cfg());
        assert!(orchestrator.registry.get("amass").is_some());
    }

    #[test]
    fn with_registry_replaces_the_default() {
        let orchestrator = Orchestrator::new(cfg()).with_registry(AdapterRegistry::empty());
        assert!(orchestrator.registry.get("amass").is_none());
    }

    #[tokio::test]
    async fn run_on_an_empty_tool_list_produces_only_unknown_and_no_artefacts() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::new("example.com", camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap());
        let orchestrator = Orchestrator::new(cfg).with_registry(AdapterRegistry::empty());
        let report = orchestrator.run().await.unwrap();
        assert_eq!(report.artefact_count, 0);
        assert!(report.unknown_tools.is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_names_are_surfaced_on_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::new("example.com", camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
            .with_tools(["not-a-real-tool"]);
        let orchestrator = Orchestrator::new(cfg).with_registry(AdapterRegistry::empty());
        let report = orchestrator.run().await.unwrap();
        assert_eq!(report.unknown_tools, vec!["not-a-real-tool".to_string()]);
    }

    #[tokio::test]
    async fn dry_run_skips_every_selected_stage_without_artefacts() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::new("example.com", camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
            .with_tools(["crtsh"]);
        let mut cfg = cfg;
        cfg.dry_run = true;
        let orchestrator = Orchestrator::new(cfg);
        let report = orchestrator.run().await.unwrap();
        let crtsh = report.metrics.stages.iter().find(|s| s.name == "crtsh").unwrap();
        assert_eq!(crtsh.status, Some(StageStatus::Skipped));
        assert!(crtsh.skip_reason.as_deref().unwrap_or_default().starts_with("dry-run"));
    }

    #[tokio::test]
    async fn missing_adapter_is_reported_as_missing_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::new("example.com", camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
            .with_tools(["crtsh"]);
        let orchestrator = Orchestrator::new(cfg).with_registry(AdapterRegistry::empty());
        let report = orchestrator.run().await.unwrap();
        let crtsh = report.metrics.stages.iter().find(|s| s.name == "crtsh").unwrap();
        assert_eq!(crtsh.status, Some(StageStatus::Missing));
    }

    #[tokio::test]
    async fn censys_without_credentials_is_skipped_with_reason() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::new("example.com", camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
            .with_tools(["censys"]);
        let orchestrator = Orchestrator::new(cfg);
        let report = orchestrator.run().await.unwrap();
        let censys = report.metrics.stages.iter().find(|s| s.name == "censys").unwrap();
        assert_eq!(censys.status, Some(StageStatus::Skipped));
        assert_eq!(censys.skip_reason.as_deref(), Some("censys credentials not configured"));
    }

    #[tokio::test]
    async fn domain_scope_mode_skips_subdomain_sources_and_injects_bare_target() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::new("example.com", camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
            .with_tools(["amass"])
            .with_scope_mode(ScopeMode::Domain);
        let orchestrator = Orchestrator::new(cfg).with_registry(AdapterRegistry::empty());
        let report = orchestrator.run().await.unwrap();
        let amass = report.metrics.stages.iter().find(|s| s.name == "amass").unwrap();
        assert_eq!(amass.status, Some(StageStatus::Skipped));
        assert_eq!(report.artefact_count, 1);
    }

    #[tokio::test]
    async fn waybackurls_without_deduped_domains_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::new("example.com", camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
            .with_tools(["waybackurls"]);
        let orchestrator = Orchestrator::new(cfg);
        let report = orchestrator.run().await.unwrap();
        let wayback = report.metrics.stages.iter().find(|s| s.name == "waybackurls").unwrap();
        assert_eq!(wayback.status, Some(StageStatus::Skipped));
        assert_eq!(wayback.skip_reason.as_deref(), Some("no deduped domains available"));
    }

    struct AlwaysOkAdapter;

    #[async_trait::async_trait]
    impl ToolAdapter for AlwaysOkAdapter {
        fn name(&self) -> &'static str {
            "rdap"
        }

        async fn run(
            &self,
            _ctx: &AdapterContext,
            _cancel: &pr_core::CancellationToken,
            _out: tokio::sync::mpsc::Sender<String>,
        ) -> Result<(), pr_adapters::AdapterError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn second_run_reuses_the_execution_cache() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let cfg = Config::new("example.com", out_dir).with_tools(["rdap"]);
        let registry = AdapterRegistry::empty().with_adapter("rdap", Arc::new(AlwaysOkAdapter));

        let orchestrator = Orchestrator::new(cfg.clone()).with_registry(registry.clone());
        let first = orchestrator.run().await.unwrap();
        let rdap = first.metrics.stages.iter().find(|s| s.name == "rdap").unwrap();
        assert_eq!(rdap.status, Some(StageStatus::Ok));

        let orchestrator = Orchestrator::new(cfg).with_registry(registry);
        let second = orchestrator.run().await.unwrap();
        let rdap = second.metrics.stages.iter().find(|s| s.name == "rdap").unwrap();
        assert_eq!(rdap.status, Some(StageStatus::CacheReused));
    }
}
