//! `dnsx` adapter (active-only, requires a non-empty deduped domain set,
//! produces dns).

use async_trait::async_trait;
use pr_core::CancellationToken;
use pr_runner::CommandSpec;
use tokio::sync::mpsc;

use crate::context::AdapterContext;
use crate::error::AdapterError;
use crate::support::run_and_forward_tagged;
use crate::ToolAdapter;

pub struct DnsxAdapter;

#[async_trait]
impl ToolAdapter for DnsxAdapter {
    fn name(&self) -> &'static str {
        "dnsx"
    }

    async fn run(&self, ctx: &AdapterContext, cancel: &CancellationToken, out: mpsc::Sender<String>) -> Result<(), AdapterError> {
        let stdin = ctx.domains.join("\n");
        let spec = CommandSpec::new("dnsx").arg("-silent").arg("-a").arg("-resp");
        run_and_forward_tagged(self.name(), &spec, cancel, &out, Some(&stdin), |line| format!("dns: {line}")).await
    }
}
