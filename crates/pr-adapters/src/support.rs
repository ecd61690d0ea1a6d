//! Shared subprocess-forwarding and manifest-reading helpers used by the
//! concrete tool adapters.

use camino::Utf8Path;
use pr_core::{ArtefactType, CancellationToken};
use pr_runner::CommandSpec;
use tokio::sync::mpsc;

use crate::error::AdapterError;

/// Spawn `spec`, optionally feeding `stdin_data` first, and relay every
/// stdout/stderr line onto `out` unmodified. Never closes `out`
/// ("never close `out`").
pub(crate) async fn run_and_forward(
    tool: &str,
    spec: &CommandSpec,
    cancel: &CancellationToken,
    out: &mpsc::Sender<String>,
    stdin_data: Option<&str>,
) -> Result<(), AdapterError> {
    run_and_forward_tagged(tool, spec, cancel, out, stdin_data, |line| line).await
}

/// As [`run_and_forward`], but each relayed line is rewritten by `tag` first,
/// for adapters whose raw output doesn't self-identify its category
/// (`dnsx`'s resolved hosts, `httpx`'s active-probe JSON).
pub(crate) async fn run_and_forward_tagged(
    tool: &str,
    spec: &CommandSpec,
    cancel: &CancellationToken,
    out: &mpsc::Sender<String>,
    stdin_data: Option<&str>,
    tag: impl Fn(String) -> String + Send + 'static,
) -> Result<(), AdapterError> {
    let (tx, mut rx) = mpsc::channel::<String>(512);
    let out = out.clone();
    let forward = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if out.send(tag(line)).await.is_err() {
                    break;
                }
            }
        });

    let result = pr_runner::spawn_streaming_with_input(spec, cancel, tx, stdin_data).await;
    let _ = forward.await;

    match result {
        Ok(_status) => Ok(()),
        Err(source) => Err(AdapterError::from_runner(tool, source)),
    }
}

/// Run `spec` to completion and return its full stdout as one string,
/// without forwarding anything onto the sink; for adapters whose output is
/// a single JSON document rather than a stream of self-contained lines
/// (`crt.sh`, `censys`, RDAP).
pub(crate) async fn run_and_collect(tool: &str, spec: &CommandSpec, cancel: &CancellationToken) -> Result<String, AdapterError> {
    let (tx, mut rx) = mpsc::channel::<String>(4096);
    let collector = tokio::spawn(async move {
            let mut lines = Vec::new();
            while let Some(line) = rx.recv().await {
                lines.push(line);
            }
            lines.join("\n")
        });

    let result = pr_runner::spawn_streaming(spec, cancel, tx).await;
    let body = collector.await.unwrap_or_default();

    match result {
        Ok(_status) => Ok(body),
        Err(source) => Err(AdapterError::from_runner(tool, source)),
    }
}

/// Artefact types that materialise under `routes/...` rather than
/// `domains`, `meta.*`, `rdap`, or `certs` (mirrors the `ROUTE_FAMILY`
    /// grouping in the materialiser).
fn is_route_family(kind: ArtefactType) -> bool {
    !matches!(
        kind,
        ArtefactType::Domain | ArtefactType::Dns | ArtefactType::Meta | ArtefactType::Rdap | ArtefactType::Certificate
    )
}

/// Read `manifest_path` and return the canonical values of every route-family
/// artefact that is both `active` and `up`: the precondition input for
/// `subjs` ("live routes").
pub fn live_active_routes(manifest_path: &Utf8Path) -> Result<Vec<String>, AdapterError> {
    filter_manifest(manifest_path, |a| is_route_family(a.kind) && a.active && a.up)
}

/// Read `manifest_path` and return every JS artefact's canonical value,
/// passive or active: the input `linkfinderevo` scans for further links.
pub fn js_routes(manifest_path: &Utf8Path) -> Result<Vec<String>, AdapterError> {
    filter_manifest(manifest_path, |a| a.kind == ArtefactType::Js)
}

fn filter_manifest(manifest_path: &Utf8Path, keep: impl Fn(&pr_core::Artefact) -> bool) -> Result<Vec<String>, AdapterError> {
    let text = match std::fs::read_to_string(manifest_path.as_std_path()) {
        Ok(text) => text,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(AdapterError::ManifestRead {
                    path: manifest_path.to_string(),
                    source,
                })
        }
    };

    let mut seen = std::collections::HashSet::new();
    let mut values = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(artefact) = serde_json::from_str::<pr_core::Artefact>(line) else {
            continue;
        };
        if keep(&artefact) && seen.insert(artefact.value.clone()) {
            values.push(artefact.value);
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pr_core::Artefact;
    use std::io::Write;

    fn write_manifest(path: &std::path::Path, artefacts: &[Artefact]) {
        let mut f = std::fs::File::create(path).unwrap();
        for a in artefacts {
            writeln!(f, "{}", serde_json::to_string(a).unwrap()).unwrap();
        }
    }

    #[test]
    fn live_active_routes_filters_to_active_and_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts.jsonl");
        let mut live = Artefact::new(ArtefactType::Route, "https://a.example.com/", "httpx").active(true);
        live.up = true;
        let mut dead = Artefact::new(ArtefactType::Route, "https://b.example.com/", "httpx").active(true);
        dead.up = false;
        let passive = Artefact::new(ArtefactType::Route, "https://c.example.com/", "gau");
        write_manifest(&path, &[live, dead, passive]);

        let utf8 = Utf8Path::from_path(&path).unwrap();
        let routes = live_active_routes(utf8).unwrap();
        assert_eq!(routes, vec!["https://a.example.com/".to_string()]);
    }

    #[test]
    fn missing_manifest_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts.jsonl");
        let utf8 = Utf8Path::from_path(&path).unwrap();
        assert_eq!(live_active_routes(utf8).unwrap(), Vec::<String>::new());
    }
}
