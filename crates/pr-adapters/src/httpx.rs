//! `httpx` active-probing adapter (active-only, produces active
//! routes, domains and html via its JSON output mode).

use async_trait::async_trait;
use pr_core::CancellationToken;
use pr_runner::CommandSpec;
use tokio::sync::mpsc;

use crate::context::AdapterContext;
use crate::error::AdapterError;
use crate::support::run_and_forward_tagged;
use crate::ToolAdapter;

pub struct HttpxAdapter;

#[async_trait]
impl ToolAdapter for HttpxAdapter {
    fn name(&self) -> &'static str {
        "httpx"
    }

    async fn run(&self, ctx: &AdapterContext, cancel: &CancellationToken, out: mpsc::Sender<String>) -> Result<(), AdapterError> {
        let stdin = ctx.domains.join("\n");
        let mut spec = CommandSpec::new("httpx")
        .arg("-silent")
        .arg("-json")
        .arg("-status-code")
        .arg("-title")
        .arg("-content-type");
        if let Some(proxy) = &ctx.proxy {
            spec = spec.arg("-http-proxy").arg(proxy);
        }
        // Every line httpx emits is a probe result; routes
        // active-mode lines through the `active:` prefix before the
        // per-category dispatch, so that's applied uniformly here rather
        // than per field inside the JSON.
        run_and_forward_tagged(self.name(), &spec, cancel, &out, Some(&stdin), |line| format!("active:{line}")).await
    }
}
