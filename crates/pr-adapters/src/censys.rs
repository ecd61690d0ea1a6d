//! Censys certificate-search adapter (cert-sources group, requires
//! credentials, produces certificates and domains). The orchestrator is
//! expected to skip this stage entirely when
//! `cfg.has_credentials_for("censys")` is false; the check here is a
//! defensive second layer, not the primary gate.

use async_trait::async_trait;
use pr_core::CancellationToken;
use pr_runner::CommandSpec;
use tokio::sync::mpsc;

use crate::context::AdapterContext;
use crate::error::AdapterError;
use crate::support::run_and_collect;
use crate::ToolAdapter;

pub struct CensysAdapter;

#[async_trait]
impl ToolAdapter for CensysAdapter {
    fn name(&self) -> &'static str {
        "censys"
    }

    async fn run(&self, ctx: &AdapterContext, cancel: &CancellationToken, out: mpsc::Sender<String>) -> Result<(), AdapterError> {
        let (Some(api_id), Some(api_secret)) = (ctx.credential("censys", "api_id"), ctx.credential("censys", "api_secret")) else {
            return Err(AdapterError::MissingCredentials {
                    tool: self.name().to_string(),
                });
        };

        let url = format!("https://search.censys.io/api/v2/certs/search?q={}", ctx.target);
        let spec = CommandSpec::new("curl")
        .arg("-s")
        .arg("-m")
        .arg("30")
        .arg("-u")
        .arg(format!("{api_id}:{api_secret}"))
        .arg(url);
        let body = run_and_collect(self.name(), &spec, cancel).await?;

        let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) else {
            let _ = out.send("meta: censys returned no parseable response".to_string()).await;
            return Ok(());
        };
        let hits = value
        .get("result")
        .and_then(|r| r.get("hits"))
        .and_then(|h| h.as_array())
        .cloned()
        .unwrap_or_default();

        for hit in hits {
            let fingerprint = hit.get("fingerprint_sha256").and_then(|v| v.as_str()).unwrap_or_default();
            let names: Vec<String> = hit
            .get("names")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|n| n.as_str().map(str::to_lowercase)).collect())
            .unwrap_or_default();

            let meta = serde_json::json!({
                    "sha256": fingerprint,
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
