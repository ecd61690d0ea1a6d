//! Tool adapters: one [`ToolAdapter`] implementation per external binary or
//! HTTP API in the orchestrator's stage table. Each adapter owns exactly the
//! argv/stdin shape and output tagging its tool needs; classification,
//! scoping, and deduping happen downstream in the sink once lines reach it.

mod amass;
mod assetfinder;
mod censys;
mod context;
mod crtsh;
mod dnsx;
mod error;
mod gau;
mod httpx;
mod linkfinderevo;
mod rdap;
mod registry;
mod subfinder;
mod subjs;
mod support;
mod waybackurls;

use async_trait::async_trait;
use pr_core::CancellationToken;
use tokio::sync::mpsc;

pub use amass::AmassAdapter;
pub use assetfinder::AssetfinderAdapter;
pub use censys::CensysAdapter;
pub use context::AdapterContext;
pub use crtsh::CrtShAdapter;
pub use dnsx::DnsxAdapter;
pub use error::AdapterError;
pub use gau::GauAdapter;
pub use httpx::HttpxAdapter;
pub use linkfinderevo::LinkfinderEvoAdapter;
pub use rdap::RdapAdapter;
pub use registry::AdapterRegistry;
pub use subfinder::SubfinderAdapter;
pub use subjs::SubjsAdapter;
pub use support::{js_routes, live_active_routes};
pub use waybackurls::WaybackurlsAdapter;

/// A single pipeline stage's contract (external tool
    /// contract): run to completion, streaming every emitted line onto `out`
/// untouched and in order, and cooperatively stop as soon as `cancel` fires.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// The stage name used for config lookups, cache/checkpoint keys, and
    /// metrics, matching the name used in the orchestrator's stage table.
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &AdapterContext, cancel: &CancellationToken, out: mpsc::Sender<String>) -> Result<(), AdapterError>;
}
