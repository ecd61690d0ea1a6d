//! The run configuration the orchestrator is constructed from.
//!
//! This crate does not parse CLI flags or discover a config file on disk by
//! searching upward through directories; that surface stays a thin,
//! external concern. It only defines the typed shape a loaded config takes
//! and a minimal TOML loader so the workspace is runnable end to end without
//! a full flag-parsing layer.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Whether subdomain enumeration should run at all.
///
/// "Scope-mode short-circuit": `Domain` skips
/// `{amass, subfinder, assetfinder, rdap}` and injects the bare target into
/// the sink before the pipeline starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeMode {
    /// Full subdomain enumeration (default).
    #[default]
    Subdomains,
    /// Only the bare target domain is in play.
    Domain,
}

/// Typed, already-resolved run configuration.
///
/// Construct via [`Config::from_file`] plus field overrides, or directly
/// with [`Config::new()`] for tests and programmatic embedding.
#[derive(Debug, Clone)]
pub struct Config {
    pub target: String,
    pub out_dir: Utf8PathBuf,
    pub active: bool,
    pub workers: usize,
    pub timeout_s: u64,
    pub tools: Vec<String>,
    pub tool_timeouts: BTreeMap<String, u64>,
    pub proxy: Option<String>,
    pub credentials: BTreeMap<String, String>,
    pub scope_mode: ScopeMode,
    pub dry_run: bool,
}

impl Config {
    /// Construct a config with sane defaults for everything but `target` and
    /// `tools`. Zero `workers` is clamped to 1; `timeout_s` below 120 is not
    /// clamped here; the orchestrator applies `max(timeout_s, 120)` itself
    /// when computing a stage's adaptive timeout base.
    #[must_use]
    pub fn new(target: impl Into<String>, out_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            target: target.into(),
            out_dir: out_dir.into(),
            active: false,
            workers: 4,
            timeout_s: 120,
            tools: Vec::new(),
            tool_timeouts: BTreeMap::new(),
            proxy: None,
            credentials: BTreeMap::new(),
            scope_mode: ScopeMode::Subdomains,
            dry_run: false,
        }
    }

    #[must_use]
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    #[must_use]
    pub fn with_scope_mode(mut self, scope_mode: ScopeMode) -> Self {
        self.scope_mode = scope_mode;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Whether credentials for `tool` (e.g. `censys`) are present, keyed as
    /// `<tool>_<field>` (`censys_api_id`, `censys_api_secret`,...).
    #[must_use]
    pub fn has_credentials_for(&self, tool: &str) -> bool {
        let prefix = format!("{tool}_");
        self.credentials.keys().any(|k| k.starts_with(&prefix))
    }

    /// Target-directory sanitisation: parse out a hostname if
    /// the target looks like a URL, trim slashes, replace `.`, `/`, `\` with
    /// `_`, trim leading/trailing `_`; empty becomes `passive_rec`.
    #[must_use]
    pub fn sanitised_target_dir(&self) -> String {
        sanitise_target(&self.target)
    }
}

#[must_use]
pub fn sanitise_target(target: &str) -> String {
    let host = if target.contains("://") {
        url::Url::parse(target)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| target.to_string())
    } else {
        target.to_string()
    };
    let trimmed = host.trim_matches('/');
    let replaced: String = trimmed
    .chars()
    .map(|c| if matches!(c, '.' | '/' | '\\') { '_' } else { c })
    .collect();
    let cleaned = replaced.trim_matches('_');
    if cleaned.is_empty() {
        "passive_rec".to_string()
    } else {
        cleaned.to_string()
    }
}

/// On-disk TOML shape. Every field is optional; absent fields fall back to
/// [`Config::new()`]'s defaults. Field names match the config keys a user
/// would write in `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawConfig {
    pub target: Option<String>,
    pub out_dir: Option<String>,
    pub active: Option<bool>,
    pub workers: Option<usize>,
    pub timeout_s: Option<u64>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub tool_timeouts: BTreeMap<String, u64>,
    pub proxy: Option<String>,
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
    pub scope_mode: Option<ScopeMode>,
    #[serde(default)]
    pub dry_run: bool,
}

impl RawConfig {
    #[must_use]
    pub fn into_config(self) -> Config {
        let target = self.target.unwrap_or_default();
        let out_dir = self.out_dir.unwrap_or_else(|| ".".to_string());
        let mut cfg = Config::new(target, Utf8PathBuf::from(out_dir));
        cfg.active = self.active.unwrap_or(false);
        if let Some(w) = self.workers {
            cfg.workers = w.max(1);
        }
        if let Some(t) = self.timeout_s {
            cfg.timeout_s = t;
        }
        cfg.tools = self.tools;
        cfg.tool_timeouts = self.tool_timeouts;
        cfg.proxy = self.proxy;
        cfg.credentials = self.credentials;
        cfg.scope_mode = self.scope_mode.unwrap_or_default();
        cfg.dry_run = self.dry_run;
        cfg
    }
}
