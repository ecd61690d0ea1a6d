//! `assetfinder` adapter (subdomain-sources group, produces domains).

use async_trait::async_trait;
use pr_core::CancellationToken;
use pr_runner::CommandSpec;
use tokio::sync::mpsc;

use crate::context::AdapterContext;
use crate::error::AdapterError;
use crate::support::run_and_forward;
use crate::ToolAdapter;

pub struct AssetfinderAdapter;

#[async_trait]
impl ToolAdapter for AssetfinderAdapter {
    fn name(&self) -> &'static str {
        "assetfinder"
    }

    async fn run(&self, ctx: &AdapterContext, cancel: &CancellationToken, out: mpsc::Sender<String>) -> Result<(), AdapterError> {
        let spec = CommandSpec::new("assetfinder").arg("--subs-only").arg(&ctx.target);
        run_and_forward(self.name(), &spec, cancel, &out, None).await
    }
}
