//! crt.sh certificate-transparency adapter (cert-sources group, produces
//! certificates and domains).

use async_trait::async_trait;
use pr_core::CancellationToken;
use pr_runner::CommandSpec;
use tokio::sync::mpsc;

use crate::context::AdapterContext;
use crate::error::AdapterError;
use crate::support::run_and_collect;
use crate::ToolAdapter;

pub struct CrtShAdapter;

#[async_trait]
impl ToolAdapter for CrtShAdapter {
    fn name(&self) -> &'static str {
        "crtsh"
    }

    async fn run(&self, ctx: &AdapterContext, cancel: &CancellationToken, out: mpsc::Sender<String>) -> Result<(), AdapterError> {
        let url = format!("https://crt.sh/?q=%25.{}&output=json", ctx.target);
        let spec = CommandSpec::new("curl").arg("-s").arg("-m").arg("30").arg(url);
        let body = run_and_collect(self.name(), &spec, cancel).await?;

        let Ok(records) = serde_json::from_str::<Vec<serde_json::Value>>(&body) else {
            let _ = out.send("meta: crtsh returned no parseable records".to_string()).await;
            return Ok(());
        };

        for record in records {
            let cn = record.get("common_name").and_then(|v| v.as_str()).unwrap_or_default();
            let serial = record.get("serial_number").and_then(|v| v.as_str()).unwrap_or_default();
            let issuer = record.get("issuer_name").and_then(|v| v.as_str()).unwrap_or_default();
            let names: Vec<String> = record
            .get("name_value")
            .and_then(|v| v.as_str())
            .map(|s| s.lines().map(str::to_lowercase).collect())
            .unwrap_or_default();

            let meta = serde_json::json!({
                    "cn": cn,
                    "serial": serial,
                    "issuer": issuer,
                    "names": names,
                });
            if out.send(format!("cert: {meta}")).await.is_err() {
                return Ok(());
            }
            for name in &names {
                if out.send(name.clone()).await.is_err() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}
