//! `linkfinderevo` adapter (active-only, produces routes). Scans the JS
//! files already recorded in the manifest for further endpoint links, same
//! manifest-driven shape as `subjs`.

use async_trait::async_trait;
use pr_core::CancellationToken;
use pr_runner::CommandSpec;
use tokio::sync::mpsc;

use crate::context::AdapterContext;
use crate::error::AdapterError;
use crate::support::{js_routes, run_and_forward};
use crate::ToolAdapter;

pub struct LinkfinderEvoAdapter;

#[async_trait]
impl ToolAdapter for LinkfinderEvoAdapter {
    fn name(&self) -> &'static str {
        "linkfinderevo"
    }

    async fn run(&self, ctx: &AdapterContext, cancel: &CancellationToken, out: mpsc::Sender<String>) -> Result<(), AdapterError> {
        let js_files = js_routes(&ctx.manifest_path)?;
        if js_files.is_empty() {
            return Ok(());
        }
        let stdin = js_files.join("\n");
        let spec = CommandSpec::new("linkfinderevo").arg("-i").arg("-").arg("-o").arg("cli");
        run_and_forward(self.name(), &spec, cancel, &out, Some(&stdin)).await
    }
}
