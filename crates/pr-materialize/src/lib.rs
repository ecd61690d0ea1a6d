//! Materialiser: replays `artifacts.jsonl` into the fixed catalogue of
//! `.passive`/`.active` files under `<outdir>/<target>/`.
//!
//! The manifest is the only source of truth; re-running the materialiser
//! over an unchanged manifest must produce byte-identical files. Route-
//! family types additionally fan out into the generic
//! `routes/routes.{passive,active}` listing alongside their own subcategory
//! file, so that file is always the superset view across every route
//! subcategory.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use pr_core::atomic_write::write_atomic_str;
use pr_core::{Artefact, ArtefactType};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("manifest not found at {0}")]
    ManifestMissing(PathBuf),
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: pr_core::CoreError,
    },
    #[error("malformed manifest line {line_no} in {path}: {source}")]
    MalformedLine {
        path: PathBuf,
        line_no: usize,
        #[source]
        source: serde_json::Error,
    },
}

const ROUTE_FAMILY: &[ArtefactType] = &[
    ArtefactType::Route,
    ArtefactType::MetaRoute,
    ArtefactType::Js,
    ArtefactType::Html,
    ArtefactType::Image,
    ArtefactType::Maps,
    ArtefactType::Json,
    ArtefactType::Api,
    ArtefactType::Wasm,
    ArtefactType::Svg,
    ArtefactType::Crawl,
    ArtefactType::Css,
    ArtefactType::Font,
    ArtefactType::Video,
    ArtefactType::Doc,
    ArtefactType::Archive,
];

fn render_line(artefact: &Artefact) -> &str {
    match artefact.kind {
        ArtefactType::Meta | ArtefactType::Rdap => artefact
        .metadata
        .get("raw")
        .and_then(|v| v.as_str())
        .unwrap_or(artefact.value.as_str()),
        _ => artefact.value.as_str(),
    }
}

/// Replay `<outdir>/<target>/artifacts.jsonl` into the per-category
/// `.passive`/`.active` files. `root` is `<outdir>/<target>`.
pub fn materialize(root: &Path) -> Result<MaterializeReport, MaterializeError> {
    let manifest_path = root.join("artifacts.jsonl");
    if !manifest_path.exists() {
        return Err(MaterializeError::ManifestMissing(manifest_path));
    }
    let file = fs::File::open(&manifest_path).map_err(|source| MaterializeError::Read {
            path: manifest_path.clone(),
            source,
        })?;
    let reader = BufReader::new(file);

    // (type, active) -> ordered lines. BTreeMap keeps type iteration
    // deterministic; within each bucket, insertion order (manifest order)
    // is preserved via a Vec.
    let mut buckets: BTreeMap<(ArtefactType, bool), Vec<String>> = BTreeMap::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| MaterializeError::Read {
                path: manifest_path.clone(),
                source,
            })?;
        if line.trim().is_empty() {
            continue;
        }
        let artefact: Artefact = serde_json::from_str(&line).map_err(|source| MaterializeError::MalformedLine {
                path: manifest_path.clone(),
                line_no: line_no + 1,
                source,
            })?;
        let rendered = render_line(&artefact).to_string();
        buckets.entry((artefact.kind, artefact.active)).or_default().push(rendered.clone());
        if ROUTE_FAMILY.contains(&artefact.kind) && artefact.kind != ArtefactType::Route {
            buckets
            .entry((ArtefactType::Route, artefact.active))
            .or_default()
            .push(rendered);
        }
    }

    let mut files_written = 0usize;
    for (&(kind, active), lines) in &buckets {
        if active && !kind.has_active_variant() {
            continue;
        }
        let suffix = if active { "active" } else { "passive" };
        let path = root.join(kind.subdir()).join(format!("{}.{}", kind.file_stem(), suffix));
        let mut content = String::with_capacity(lines.iter().map(String::len).sum::<usize>() + lines.len());
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }
        write_atomic_str(&path, &content).map_err(|source| MaterializeError::Write {
                path: path.clone(),
                source,
            })?;
        files_written += 1;
    }

    Ok(MaterializeReport {
            artefact_count: buckets.values().map(Vec::len).sum(),
            files_written,
        })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MaterializeReport {
    pub artefact_count: usize,
    pub files_written: usize,
}
