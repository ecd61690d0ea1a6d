//! Command-line entrypoint.
//!
//! Flag parsing and config loading stay deliberately thin: a config file
//! supplies the bulk of the shape (`pr_config::Config::from_file`) and a
//! handful of flags override it, following a "CLI flags > config file >
//! defaults" precedence. This binary only ever runs one pipeline, so
//! there's no subcommand surface to speak of.

use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use pr_config::{Config, ScopeMode};
use pr_core::CancellationToken;
use pr_orchestrator::{LineProgressRecorder, Orchestrator};

use crate::error::AppError;

/// passive-rec - a dependency-ordered passive/active web reconnaissance pipeline.
#[derive(Parser, Debug)]
#[command(name = "passive-rec", version, about)]
pub struct Args {
    /// Target hostname or domain to recon.
    pub target: String,

    /// Path to a TOML config file; flags below override whatever it sets.
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Directory the run's output directory is created under.
    #[arg(long, default_value = ".")]
    pub out_dir: String,

    /// Enable active-only stages (dnsx, httpx, subjs, linkfinderevo).
    #[arg(long)]
    pub active: bool,

    /// Concurrent worker count for the sink and active tools.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Base per-stage timeout in seconds before the adaptive formula applies.
    #[arg(long)]
    pub timeout_s: Option<u64>,

    /// Tool to run; repeat for multiple. Declared pipeline order is used
    /// regardless of the order given here.
    #[arg(long = "tool")]
    pub tools: Vec<String>,

    /// Outbound HTTP proxy URL passed to adapters that support one.
    #[arg(long)]
    pub proxy: Option<String>,

    /// "subdomains" (default) or "domain"; see `pr_config::ScopeMode`.
    #[arg(long)]
    pub scope: Option<String>,

    /// Select stages and compute timeouts without invoking any adapter.
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose logging (debug level, span-close events, target names).
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_scope(raw: &str) -> Result<ScopeMode, AppError> {
    match raw.to_lowercase().as_str() {
        "subdomains" => Ok(ScopeMode::Subdomains),
        "domain" => Ok(ScopeMode::Domain),
        other => Err(AppError::Logging(format!(
            "invalid --scope '{other}', expected 'subdomains' or 'domain'"
        ))),
    }
}

fn build_config(args: &Args) -> Result<Config, AppError> {
    let mut cfg = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::new(args.target.clone(), Utf8PathBuf::from(args.out_dir.clone())),
    };

    if args.config.is_some() {
        // A config file was loaded for its tool list/credentials/etc, but
        // the target and out_dir given on the command line still win.
        cfg.target = args.target.clone();
        cfg.out_dir = Utf8PathBuf::from(args.out_dir.clone());
    }
    if args.active {
        cfg.active = true;
    }
    if let Some(workers) = args.workers {
        cfg.workers = workers.max(1);
    }
    if let Some(timeout_s) = args.timeout_s {
        cfg.timeout_s = timeout_s;
    }
    if !args.tools.is_empty() {
        cfg.tools = args.tools.clone();
    }
    if args.proxy.is_some() {
        cfg.proxy = args.proxy.clone();
    }
    if let Some(scope) = &args.scope {
        cfg.scope_mode = parse_scope(scope)?;
    }
    if args.dry_run {
        cfg.dry_run = true;
    }

    Ok(cfg)
}

/// Parse arguments, load configuration, run the pipeline to completion, and
/// print a one-line summary. All output (including errors) happens here;
/// `main` only maps the result to a process exit code.
pub fn run() -> Result<(), AppError> {
    let args = Args::parse();

    pr_core::logging::init_tracing(args.verbose).map_err(|e| AppError::Logging(e.to_string()))?;

    let cfg = build_config(&args)?;

    let runtime = tokio::runtime::Runtime::new().map_err(AppError::Runtime)?;

    let report = runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let ctrl_c_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling in-flight stages");
                ctrl_c_cancel.cancel();
            }
        });

        let orchestrator = Orchestrator::new(cfg).with_progress(Arc::new(LineProgressRecorder));
        orchestrator.run_with_cancel(cancel).await
    })?;

    println!(
        "passive-rec: {} artefacts written to {}",
        report.artefact_count, report.manifest_path
    );
    if !report.unknown_tools.is_empty() {
        println!("unrecognised tools ignored: {}", report.unknown_tools.join(", "));
    }
    tracing::info!(
        run_hash = %report.run_hash,
        artefact_count = report.artefact_count,
        target_dir = %report.target_dir,
        "run complete"
    );

    Ok(())
}
