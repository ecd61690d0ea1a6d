//! `waybackurls` adapter (archive-sources group, requires a non-empty
//! deduped domain set, produces routes).

use async_trait::async_trait;
use pr_core::CancellationToken;
use pr_runner::CommandSpec;
use tokio::sync::mpsc;

use crate::context::AdapterContext;
use crate::error::AdapterError;
use crate::support::run_and_forward;
use crate::ToolAdapter;

pub struct WaybackurlsAdapter;

#[async_trait]
impl ToolAdapter for WaybackurlsAdapter {
    fn name(&self) -> &'static str {
        "waybackurls"
    }

    async fn run(&self, ctx: &AdapterContext, cancel: &CancellationToken, out: mpsc::Sender<String>) -> Result<(), AdapterError> {
        let stdin = ctx.domains.join("\n");
        let spec = CommandSpec::new("waybackurls");
        run_and_forward(self.name(), &spec, cancel, &out, Some(&stdin)).await
    }
}
