//! `gau` (GetAllUrls) adapter (archive-sources group, requires a non-empty
//! deduped domain set, produces routes).

use async_trait::async_trait;
use pr_core::CancellationToken;
use pr_runner::CommandSpec;
use tokio::sync::mpsc;

use crate::context::AdapterContext;
use crate::error::AdapterError;
use crate::support::run_and_forward;
use crate::ToolAdapter;

pub struct GauAdapter;

#[async_trait]
impl ToolAdapter for GauAdapter {
    fn name(&self) -> &'static str {
        "gau"
    }

    async fn run(&self, ctx: &AdapterContext, cancel: &CancellationToken, out: mpsc::Sender<String>) -> Result<(), AdapterError> {
        let stdin = ctx.domains.join("\n");
        let spec = CommandSpec::new("gau").arg("--subs");
        run_and_forward(self.name(), &spec, cancel, &out, Some(&stdin)).await
    }
}
