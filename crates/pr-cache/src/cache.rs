//! Execution cache
//!
//! Keyed by stage name and the run hash of the configuration that produced
//! it; an entry older than `max_age` or whose hash no longer matches the
//! current run is not reusable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pr_core::atomic_write::write_atomic_str;
use pr_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    hash: String,
    completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    steps: BTreeMap<String, CacheEntry>,
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            steps: BTreeMap::new(),
        }
    }
}

/// The on-disk `.passive-cache.json` execution cache, keyed by stage name.
pub struct ExecutionCache {
    path: PathBuf,
    file: CacheFile,
}

impl ExecutionCache {
    /// Load the cache at `path`, or start empty if it doesn't exist yet or
    /// fails to parse (a corrupt cache is treated as cold, never fatal).
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = std::fs::read_to_string(&path)
        .ok()
        .and_then(|text| serde_json::from_str::<CacheFile>(&text).ok())
        .unwrap_or_default();
        Self { path, file }
    }

    /// `should_skip(step, run_hash, max_age) -> (skip, completed_at)`
    /// Reuse requires: an entry exists, its hash matches
    /// `run_hash`, and it's younger than `max_age`.
    #[must_use]
    pub fn should_skip(&self, step: &str, run_hash: &str, max_age: chrono::Duration) -> (bool, Option<DateTime<Utc>>) {
        match self.file.steps.get(step) {
            Some(entry) if entry.hash == run_hash && Utc::now() - entry.completed_at <= max_age => {
                (true, Some(entry.completed_at))
            }
            Some(entry) => (false, Some(entry.completed_at)),
            None => (false, None),
        }
    }

    pub fn mark_complete(&mut self, step: &str, run_hash: &str) {
        self.file.steps.insert(
            step.to_string(),
            CacheEntry {
                hash: run_hash.to_string(),
                completed_at: Utc::now(),
            },
        );
    }

    pub fn invalidate(&mut self, step: &str) {
        self.file.steps.remove(step);
    }

    /// Drop every entry older than `max_age`, regardless of hash.
    pub fn prune(&mut self, max_age: chrono::Duration) {
        let now = Utc::now();
        self.file.steps.retain(|_, entry| now - entry.completed_at <= max_age);
    }

    pub fn save(&self) -> CoreResult<()> {
        let text = serde_json::to_string_pretty(&self.file).map_err(CoreError::Serde)?;
        write_atomic_str(&self.path, &text)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cache_never_skips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExecutionCache::load(dir.path().join(".passive-cache.json"));
        let (skip, _) = cache.should_skip("subfinder", "hash-a", chrono::Duration::hours(24));
        assert!(!skip);
    }

    #[test]
    fn reuses_matching_hash_within_max_age() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ExecutionCache::load(dir.path().join(".passive-cache.json"));
        cache.mark_complete("subfinder", "hash-a");
        let (skip, completed_at) = cache.should_skip("subfinder", "hash-a", chrono::Duration::hours(24));
        assert!(skip);
        assert!(completed_at.is_some());
    }

    #[test]
    fn does_not_reuse_when_hash_differs() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ExecutionCache::load(dir.path().join(".passive-cache.json"));
        cache.mark_complete("subfinder", "hash-a");
        let (skip, _) = cache.should_skip("subfinder", "hash-b", chrono::Duration::hours(24));
        assert!(!skip);
    }

    #[test]
    fn does_not_reuse_entries_older_than_max_age() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ExecutionCache::load(dir.path().join(".passive-cache.json"));
        cache.mark_complete("subfinder", "hash-a");
        let (skip, _) = cache.should_skip("subfinder", "hash-a", chrono::Duration::seconds(-1));
        assert!(!skip);
    }

    #[test]
    fn save_and_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".passive-cache.json");
        let mut cache = ExecutionCache::load(&path);
        cache.mark_complete("crtsh", "hash-a");
        cache.save().unwrap();
        let reloaded = ExecutionCache::load(&path);
        let (skip, _) = reloaded.should_skip("crtsh", "hash-a", chrono::Duration::hours(24));
        assert!(skip);
    }

    #[test]
    fn invalidate_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ExecutionCache::load(dir.path().join(".passive-cache.json"));
        cache.mark_complete("crtsh", "hash-a");
        cache.invalidate("crtsh");
        let (skip, _) = cache.should_skip("crtsh", "hash-a", chrono::Duration::hours(24));
        assert!(!skip);
    }

    #[test]
    fn prune_drops_old_entries_regardless_of_hash() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ExecutionCache::load(dir.path().join(".passive-cache.json"));
        cache.mark_complete("crtsh", "hash-a");
        cache.prune(chrono::Duration::seconds(-1));
        let (skip, completed_at) = cache.should_skip("crtsh", "hash-a", chrono::Duration::hours(24));
        assert!(!skip);
        assert!(completed_at.is_none());
    }

    #[test]
    fn corrupt_cache_file_treated_as_cold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".passive-cache.json");
        std::fs::write(&path, "not json").unwrap();
        let cache = ExecutionCache::load(&path);
        let (skip, _) = cache.should_skip("anything", "hash", chrono::Duration::hours(24));
        assert!(!skip);
    }
}
