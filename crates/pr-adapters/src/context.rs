//! Per-run context every adapter is invoked with

use std::collections::BTreeMap;

use camino::Utf8PathBuf;

/// Everything an adapter needs to build its command line and interpret its
/// credentials, independent of how the orchestrator got hold of it.
#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub target: String,
    /// The deduped domain list, populated once the `dedupe` stage has run.
    /// Empty for stages that only consume `target` directly.
    pub domains: Vec<String>,
    /// `<outdir>/<target>/artifacts.jsonl`. Adapters that depend on
    /// upstream output (`subjs`, `linkfinderevo`) read it directly; the
    /// orchestrator guarantees a `Sink::flush` happened first.
    pub manifest_path: Utf8PathBuf,
    pub active: bool,
    pub proxy: Option<String>,
    pub credentials: BTreeMap<String, String>,
    pub workers: usize,
}

impl AdapterContext {
    #[must_use]
    pub fn new(target: impl Into<String>, manifest_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            target: target.into(),
            domains: Vec::new(),
            manifest_path: manifest_path.into(),
            active: false,
            proxy: None,
            credentials: BTreeMap::new(),
            workers: 4,
        }
    }

    #[must_use]
    pub fn with_domains(mut self, domains: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.domains = domains.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Credentials for `tool` are keyed `<tool>_<field>` (`censys_api_id`,
    /// `censys_api_secret`,...), matching `pr_config::Config`.
    #[must_use]
    pub fn credential(&self, tool: &str, field: &str) -> Option<&str> {
        self.credentials.get(&format!("{tool}_{field}")).map(String::as_str)
    }
}
