//! Generic atomic JSON-file list store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// A durable list of `T`, backed by one JSON file, rewritten atomically on
/// every mutation (spec §6 "Persistence layout": "one JSON file per host...
/// atomic rewrite on every mutation").
///
/// Holds no in-memory cache of its own — callers own the authoritative copy
/// (the subagent registry) and call [`JsonFileStore::save`] after every
/// change. This keeps the store itself stateless and trivially testable.
pub struct JsonFileStore<T> {
    path: PathBuf,
    _marker: std::marker::PhantomData<T>,
}

impl<T> JsonFileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Point a store at a path. Does not touch the filesystem.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: std::marker::PhantomData,
        }
    }

    /// The path this store reads from and writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all records. Returns an empty vec if the file does not exist yet
    /// (first run on a fresh host).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] or [`StorageError::Parse`] if the file
    /// exists but is unreadable or malformed.
    pub fn load(&self) -> StorageResult<Vec<T>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "registry file not found, starting empty");
                return Ok(Vec::new());
            },
            Err(e) => {
                return Err(StorageError::Read {
                    path: self.path.display().to_string(),
                    source: e,
                });
            },
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| StorageError::Parse {
            path: self.path.display().to_string(),
            source: e,
        })
    }

    /// Rewrite the entire file with `records`, atomically.
    ///
    /// Writes to a temp file in the same directory as `path` (so the final
    /// rename is on the same filesystem), fsyncs it, then renames it over
    /// the target. A reader never observes a partially-written file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialize`] if `records` cannot be
    /// serialized, or [`StorageError::Write`] if the parent directory can't
    /// be created or the temp file can't be written, synced, or persisted.
    pub fn save(&self, records: &[T]) -> StorageResult<()> {
        let body = serde_json::to_string_pretty(records).map_err(StorageError::Serialize)?;

        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| StorageError::Write {
            path: self.path.display().to_string(),
            source: e,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| StorageError::Write {
            path: self.path.display().to_string(),
            source: e,
        })?;

        tmp.write_all(body.as_bytes()).map_err(|e| StorageError::Write {
            path: self.path.display().to_string(),
            source: e,
        })?;
        tmp.as_file().sync_all().map_err(|e| StorageError::Write {
            path: self.path.display().to_string(),
            source: e,
        })?;

        tmp.persist(&self.path).map_err(|e| StorageError::Write {
            path: self.path.display().to_string(),
            source: e.error,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonFileStore<Record> = JsonFileStore::new(dir.path().join("registry.json"));
        assert_eq!(store.load().unwrap(), Vec::new());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonFileStore<Record> = JsonFileStore::new(dir.path().join("registry.json"));

        let records = vec![
            Record { id: "a".to_owned(), value: 1 },
            Record { id: "b".to_owned(), value: 2 },
        ];
        store.save(&records).unwrap();

        assert_eq!(store.load().unwrap(), records);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("dir").join("registry.json");
        let store: JsonFileStore<Record> = JsonFileStore::new(&nested);

        store.save(&[]).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonFileStore<Record> = JsonFileStore::new(dir.path().join("registry.json"));

        store
            .save(&[Record { id: "a".to_owned(), value: 1 }])
            .unwrap();
        store.save(&[]).unwrap();

        assert_eq!(store.load().unwrap(), Vec::new());
    }
}
