//! `subjs` adapter (active-only, requires live routes, produces js).
//!
//! Reads the set of routes that `httpx` found both active and reachable
//! directly out of the flushed manifest (stages depending on upstream
//! output must `flush` before reading artefacts) rather than being handed
//! them in-memory, matching the external tool contract's invocation shape
//! (`run_stage(ctx, target, outdir, out)`).

use async_trait::async_trait;
use pr_core::CancellationToken;
use pr_runner::CommandSpec;
use tokio::sync::mpsc;

use crate::context::AdapterContext;
use crate::error::AdapterError;
use crate::support::{live_active_routes, run_and_forward};
use crate::ToolAdapter;

pub struct SubjsAdapter;

impl SubjsAdapter {
    /// The orchestrator's precondition check for this stage: skip unless at least one live route has been recorded.
    #[must_use]
    pub fn has_live_routes(manifest_path: &camino::Utf8Path) -> bool {
        live_active_routes(manifest_path).map(|routes| !routes.is_empty()).unwrap_or(false)
    }
}

#[async_trait]
impl ToolAdapter for SubjsAdapter {
    fn name(&self) -> &'static str {
        "subjs"
    }

    async fn run(&self, ctx: &AdapterContext, cancel: &CancellationToken, out: mpsc::Sender<String>) -> Result<(), AdapterError> {
        let routes = live_active_routes(&ctx.manifest_path)?;
        if routes.is_empty() {
            return Ok(());
        }
        let stdin = routes.join("\n");
        let spec = CommandSpec::new("subjs");
        run_and_forward(self.name(), &spec, cancel, &out, Some(&stdin)).await
    }
}
