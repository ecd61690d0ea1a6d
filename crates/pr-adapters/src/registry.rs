//! An injectable record of adapter instances: prefer passing a registry
//! into the orchestrator over mutable package-level function variables, so
//! tests can swap in fakes.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    AmassAdapter, AssetfinderAdapter, CensysAdapter, CrtShAdapter, DnsxAdapter, GauAdapter, HttpxAdapter, LinkfinderEvoAdapter,
    RdapAdapter, SubfinderAdapter, SubjsAdapter, ToolAdapter, WaybackurlsAdapter,
};

/// A name-keyed table of adapters the orchestrator dispatches stages
/// through. Tests construct a registry with one or more names rebound to a
/// fake [`ToolAdapter`] instead of reaching for a global hook.
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn ToolAdapter>>,
}

impl AdapterRegistry {
    /// The registry the orchestrator constructs by default: one real
    /// subprocess/HTTP adapter per stage in the orchestrator's declared
    /// pipeline table.
    #[must_use]
    pub fn production() -> Self {
        let mut adapters: BTreeMap<String, Arc<dyn ToolAdapter>> = BTreeMap::new();
        adapters.insert("amass".to_string(), Arc::new(AmassAdapter));
        adapters.insert("subfinder".to_string(), Arc::new(SubfinderAdapter));
        adapters.insert("assetfinder".to_string(), Arc::new(AssetfinderAdapter));
        adapters.insert("rdap".to_string(), Arc::new(RdapAdapter));
        adapters.insert("crtsh".to_string(), Arc::new(CrtShAdapter));
        adapters.insert("censys".to_string(), Arc::new(CensysAdapter));
        adapters.insert("dnsx".to_string(), Arc::new(DnsxAdapter));
        adapters.insert("waybackurls".to_string(), Arc::new(WaybackurlsAdapter));
        adapters.insert("gau".to_string(), Arc::new(GauAdapter));
        adapters.insert("httpx".to_string(), Arc::new(HttpxAdapter));
        adapters.insert("subjs".to_string(), Arc::new(SubjsAdapter));
        adapters.insert("linkfinderevo".to_string(), Arc::new(LinkfinderEvoAdapter));
        Self { adapters }
    }

    /// An empty registry, useful as a base for tests that only want a
    /// handful of fakes bound.
    #[must_use]
    pub fn empty() -> Self {
        Self { adapters: BTreeMap::new() }
    }

    #[must_use]
    pub fn with_adapter(mut self, name: impl Into<String>, adapter: Arc<dyn ToolAdapter>) -> Self {
        self.adapters.insert(name.into(), adapter);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolAdapter>> {
        self.adapters.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_registry_has_every_declared_stage() {
        let registry = AdapterRegistry::production();
        for stage in [
            "amass",
            "subfinder",
            "assetfinder",
            "rdap",
            "crtsh",
            "censys",
            "dnsx",
            "waybackurls",
            "gau",
            "httpx",
            "subjs",
            "linkfinderevo",
        ] {
            assert!(registry.get(stage).is_some(), "missing adapter for {stage}");
        }
    }

    #[test]
    fn with_adapter_overrides_a_single_entry() {
        struct Fake;
        #[async_trait::async_trait]
        impl ToolAdapter for Fake {
            fn name(&self) -> &'static str {
                "amass"
            }
            async fn run(
                &self,
                _ctx: &crate::AdapterContext,
                _cancel: &pr_core::CancellationToken,
                _out: tokio::sync::mpsc::Sender<String>,
            ) -> Result<(), crate::AdapterError> {
                Ok(())
            }
        }

        let registry = AdapterRegistry::empty().with_adapter("amass", Arc::new(Fake));
        assert!(registry.get("amass").is_some());
        assert!(registry.get("subfinder").is_none());
    }
}
