//! `amass enum -passive` adapter (subdomain-sources group, produces domains).

use async_trait::async_trait;
use pr_core::CancellationToken;
use pr_runner::CommandSpec;
use tokio::sync::mpsc;

use crate::context::AdapterContext;
use crate::error::AdapterError;
use crate::support::run_and_forward;
use crate::ToolAdapter;

pub struct AmassAdapter;

#[async_trait]
impl ToolAdapter for AmassAdapter {
    fn name(&self) -> &'static str {
        "amass"
    }

    async fn run(&self, ctx: &AdapterContext, cancel: &CancellationToken, out: mpsc::Sender<String>) -> Result<(), AdapterError> {
        let spec = CommandSpec::new("amass")
        .arg("enum")
        .arg("-passive")
        .arg("-norecursive")
        .arg("-d")
        .arg(&ctx.target);
        run_and_forward(self.name(), &spec, cancel, &out, None).await
    }
}
