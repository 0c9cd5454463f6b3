//! JSON file storage for crawled and derived data.
//!
//! Layout under the data directory:
//! - `jockeys/<slug>.json`: one record per jockey
//! - `races/<date>/<venue-slug>.json`: one pre-race card per meeting
//! - `processed/...`: classification and summary output
//!
//! Every write replaces the whole file (temp file + rename). Stores are
//! plain values constructed per run; nothing is cached between runs.

pub mod decode;
pub mod jockeys;
pub mod lock;
pub mod slug;
pub mod summaries;
pub mod venues;

pub use jockeys::{JockeyStore, UpsertSummary};
pub use lock::RunLock;
pub use slug::slugify;
pub use summaries::{Bucket, SummaryStore};
pub use venues::VenueStore;

use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use decode::DecodeError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("name {0:?} produces an empty slug")]
    EmptySlug(String),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Directory layout rooted at the configured data directory.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn jockeys_dir(&self) -> PathBuf {
        self.root.join("jockeys")
    }

    pub fn races_dir(&self) -> PathBuf {
        self.root.join("races")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".pipeline.lock")
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let content = serde_json::to_string_pretty(value).map_err(|e| StoreError::Encode {
        path: path.to_path_buf(),
        source: e,
    })?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content).map_err(|e| StoreError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;

    Ok(())
}

/// Read a file, mapping "not found" to `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// File stems of `*.json` files in `dir`, sorted. A missing directory is empty.
pub(crate) fn list_json_stems(dir: &Path) -> Result<Vec<String>, StoreError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };

    let mut stems = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            stems.push(stem.to_string());
        }
    }
    stems.sort();

    Ok(stems)
}

/// Names of subdirectories of `dir`, sorted. A missing directory is empty.
pub(crate) fn list_subdirs(dir: &Path) -> Result<Vec<String>, StoreError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_json_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("value.json");

        write_json(&path, &vec![1, 2, 3]).unwrap();
        write_json(&path, &vec![4]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: Vec<i32> = serde_json::from_str(&content).unwrap();
        assert_eq!(value, vec![4]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_missing_paths_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        assert!(read_optional(&missing.join("a.json")).unwrap().is_none());
        assert!(list_json_stems(&missing).unwrap().is_empty());
        assert!(list_subdirs(&missing).unwrap().is_empty());
    }

    #[test]
    fn test_list_json_stems_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("c.json.tmp"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        assert_eq!(list_json_stems(dir.path()).unwrap(), vec!["a", "b"]);
    }
}
