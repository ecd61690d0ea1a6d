//! The canonical artefact manifest
//!
//! An [`ArtefactStore`] is the single in-memory index the sink records
//! every classified artefact into. It tracks first-insertion order so a
//! `flush` writes `artifacts.jsonl` in the order artefacts were first
//! seen, which in turn is what makes the materialiser's output
//! deterministic

mod normalize;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pr_core::atomic_write::write_atomic_str;
use pr_core::{Artefact, ArtefactKey, CoreError, CoreResult};

/// The canonical, deduplicated record of everything discovered so far in
/// this run.
///
/// Not thread-safe on its own; callers (the sink) are expected to guard it
/// behind a mutex, matching "the store guards its index with a
/// mutex".
pub struct ArtefactStore {
    manifest_path: PathBuf,
    order: Vec<ArtefactKey>,
    index: HashMap<ArtefactKey, Artefact>,
}

impl ArtefactStore {
    #[must_use]
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            order: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Record one artefact from `tool`. Normalises it, derives its key, then
    /// inserts it as new or merges it into the existing record at that key.
    /// Returns the key so callers (the sink) can correlate this record with
    /// dedupe keyspace decisions.
    pub fn record(&mut self, tool: &str, mut artefact: Artefact) -> ArtefactKey {
        normalize::normalize(&mut artefact);
        artefact.tool = tool.to_string();
        if artefact.tools.is_empty() {
            artefact.tools.push(tool.to_string());
        }
        let key = artefact.key();
        match self.index.get_mut(&key) {
            Some(existing) => existing.merge(&artefact),
            None => {
                self.index.insert(key.clone(), artefact);
                self.order.push(key.clone());
            }
        }
        key
    }

    #[must_use]
    pub fn get(&self, key: &ArtefactKey) -> Option<&Artefact> {
        self.index.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate artefacts in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Artefact> {
        self.order.iter().filter_map(move |k| self.index.get(k))
    }

    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Write the current set as newline-delimited JSON, one artefact per
    /// line, ordered by first insertion, atomically (`*.tmp` + rename).
    /// Safe to call repeatedly; never leaves a partial line visible to a
    /// concurrent reader.
    pub fn flush(&self) -> CoreResult<()> {
        let mut buf = String::with_capacity(self.order.len() * 128);
        for artefact in self.iter() {
            let line = serde_json::to_string(artefact).map_err(CoreError::Serde)?;
            buf.push_str(&line);
            buf.push('\n');
        }
        write_atomic_str(&self.manifest_path, &buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pr_core::ArtefactType;
    use std::fs;

    #[test]
    fn record_inserts_new_artefact() {
        let mut store = ArtefactStore::new("/tmp/unused.jsonl");
        let key = store.record("subfinder", Artefact::new(ArtefactType::Domain, "a.example.com", "subfinder"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key).unwrap().occurrences, 1);
    }

    #[test]
    fn record_merges_on_repeat_key() {
        let mut store = ArtefactStore::new("/tmp/unused.jsonl");
        store.record("subfinder", Artefact::new(ArtefactType::Domain, "a.example.com", "subfinder"));
        let key = store.record("amass", Artefact::new(ArtefactType::Domain, "a.example.com", "amass"));
        assert_eq!(store.len(), 1);
        let a = store.get(&key).unwrap();
        assert_eq!(a.occurrences, 2);
        assert_eq!(a.tools, vec!["subfinder".to_string(), "amass".to_string()]);
    }

    #[test]
    fn preserves_first_insertion_order() {
        let mut store = ArtefactStore::new("/tmp/unused.jsonl");
        store.record("t", Artefact::new(ArtefactType::Domain, "b.example.com", "t"));
        store.record("t", Artefact::new(ArtefactType::Domain, "a.example.com", "t"));
        store.record("t", Artefact::new(ArtefactType::Domain, "b.example.com", "t"));
        let values: Vec<&str> = store.iter().map(|a| a.value.as_str()).collect();
        assert_eq!(values, vec!["b.example.com", "a.example.com"]);
    }

    #[test]
    fn flush_writes_valid_jsonl_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("artifacts.jsonl");
        let mut store = ArtefactStore::new(&manifest);
        store.record("crtsh", Artefact::new(ArtefactType::Domain, "a.example.com", "crtsh"));
        store.record("crtsh", Artefact::new(ArtefactType::Domain, "b.example.com", "crtsh"));
        store.flush().unwrap();

        let content = fs::read_to_string(&manifest).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            serde_json::from_str::<serde_json::Value>(line).unwrap();
        }
        assert!(lines[0].contains("a.example.com"));
        assert!(lines[1].contains("b.example.com"));
    }

    #[test]
    fn flush_is_idempotent_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("artifacts.jsonl");
        let mut store = ArtefactStore::new(&manifest);
        store.record("crtsh", Artefact::new(ArtefactType::Domain, "a.example.com", "crtsh"));
        store.flush().unwrap();
        let first = fs::read(&manifest).unwrap();
        store.flush().unwrap();
        let second = fs::read(&manifest).unwrap();
        assert_eq!(first, second);
    }
}
