//! RDAP lookup adapter (subdomain-sources group, produces `meta` and
//! `rdap` artefacts).
//!
//! RDAP is an HTTP API, not a CLI tool; rather than adding an HTTP client
//! dependency the workspace doesn't otherwise need, this shells out to
//! `curl` through the same [`CommandSpec`]/[`pr_runner`] machinery every
//! other adapter uses (see `DESIGN.md` for the rationale).

use async_trait::async_trait;
use pr_core::CancellationToken;
use pr_runner::CommandSpec;
use tokio::sync::mpsc;

use crate::context::AdapterContext;
use crate::error::AdapterError;
use crate::support::run_and_collect;
use crate::ToolAdapter;

pub struct RdapAdapter;

#[async_trait]
impl ToolAdapter for RdapAdapter {
    fn name(&self) -> &'static str {
        "rdap"
    }

    async fn run(&self, ctx: &AdapterContext, cancel: &CancellationToken, out: mpsc::Sender<String>) -> Result<(), AdapterError> {
        let url = format!("https://rdap.org/domain/{}", ctx.target);
        let spec = CommandSpec::new("curl").arg("-s").arg("-m").arg("20").arg(url);
        let body = run_and_collect(self.name(), &spec, cancel).await?;

        let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) else {
            let _ = out.send(format!("meta: rdap lookup failed for {}", ctx.target)).await;
            return Ok(());
        };
        let Some(compact) = serde_json::to_string(&value).ok() else {
            let _ = out.send(format!("meta: rdap lookup failed for {}", ctx.target)).await;
            return Ok(());
        };
        let _ = out.send(format!("rdap: {compact}")).await;
        Ok(())
    }
}
