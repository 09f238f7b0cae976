//! Processed-file cache and its on-disk JSON form.
//!
//! The file is a JSON object keyed by absolute directory path. Each value is a
//! two element array of the directory's modification time (seconds since the
//! Unix epoch) and the names of files already handed to the command:
//!
//! ```json
//! {
//!   "/srv/inbox": [
//!     1700000000.25,
//!     ["a.csv", "b.csv"]
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Result, WatcherError};

/// Scan state for one watched directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryRecord {
    /// Directory modification time at the last scan.
    pub last_modified: f64,

    /// Names of files already dispatched.
    pub processed_files: HashSet<String>,
}

impl DirectoryRecord {
    /// Create a record with no processed files.
    pub fn new(last_modified: f64) -> Self {
        Self {
            last_modified,
            processed_files: HashSet::new(),
        }
    }

    /// Check whether a file name was already dispatched.
    pub fn is_processed(&self, name: &str) -> bool {
        self.processed_files.contains(name)
    }

    /// Record a file name as dispatched. Returns false if it already was.
    pub fn mark_processed(&mut self, name: impl Into<String>) -> bool {
        self.processed_files.insert(name.into())
    }
}

/// On-disk layout: directory -> [mtime, [names...]].
type PersistedCache = BTreeMap<String, (f64, Vec<String>)>;

/// Mapping from absolute directory path to its scan state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStore {
    records: BTreeMap<PathBuf, DirectoryRecord>,
}

impl CacheStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store from `path`, or an empty store if the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(WatcherError::CacheReadFailed {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let persisted: PersistedCache =
            serde_json::from_str(&content).map_err(|source| WatcherError::CorruptCache {
                path: path.to_path_buf(),
                source,
            })?;

        let records = persisted
            .into_iter()
            .map(|(dir, (last_modified, files))| {
                let record = DirectoryRecord {
                    last_modified,
                    processed_files: files.into_iter().collect(),
                };
                (PathBuf::from(dir), record)
            })
            .collect::<BTreeMap<_, _>>();

        debug!(
            "Loaded cache for {} directories from {}",
            records.len(),
            path.display()
        );
        Ok(Self { records })
    }

    /// Write the store to `path`.
    ///
    /// The JSON goes to a temporary file next to `path` which then replaces
    /// it, so an interrupted write leaves the previous cache intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let persisted: PersistedCache = self
            .records
            .iter()
            .map(|(dir, record)| {
                let mut files: Vec<String> = record.processed_files.iter().cloned().collect();
                files.sort();
                (
                    dir.to_string_lossy().into_owned(),
                    (record.last_modified, files),
                )
            })
            .collect();
        let mut content = serde_json::to_string_pretty(&persisted)?;
        content.push('\n');

        let write_failed = |source: std::io::Error| WatcherError::CacheWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(write_failed)?;

        let mut temp = NamedTempFile::new_in(parent).map_err(write_failed)?;
        temp.write_all(content.as_bytes()).map_err(write_failed)?;
        temp.as_file().sync_all().map_err(write_failed)?;
        temp.persist(path).map_err(|e| write_failed(e.error))?;

        debug!(
            "Saved cache for {} directories to {}",
            self.records.len(),
            path.display()
        );
        Ok(())
    }

    /// Remove every directory not in `known`, returning the removed keys.
    pub fn trim(&mut self, known: &[PathBuf]) -> Vec<PathBuf> {
        let removed: Vec<PathBuf> = self
            .records
            .keys()
            .filter(|dir| !known.contains(dir))
            .cloned()
            .collect();

        for dir in &removed {
            self.records.remove(dir);
            info!("Trimmed {} from cache", dir.display());
        }
        removed
    }

    /// Get the record for a directory.
    pub fn get(&self, dir: &Path) -> Option<&DirectoryRecord> {
        self.records.get(dir)
    }

    /// Get a mutable record for a directory.
    pub fn get_mut(&mut self, dir: &Path) -> Option<&mut DirectoryRecord> {
        self.records.get_mut(dir)
    }

    /// Get the record for a directory, creating an unscanned one if needed.
    ///
    /// New records start at modification time zero so any real directory
    /// counts as changed.
    pub fn get_or_insert(&mut self, dir: &Path) -> &mut DirectoryRecord {
        self.records
            .entry(dir.to_path_buf())
            .or_insert_with(|| DirectoryRecord::new(0.0))
    }

    /// Insert or replace the record for a directory.
    pub fn insert(&mut self, dir: impl Into<PathBuf>, record: DirectoryRecord) {
        self.records.insert(dir.into(), record);
    }

    /// Check if a directory is tracked.
    pub fn contains(&self, dir: &Path) -> bool {
        self.records.contains_key(dir)
    }

    /// Number of tracked directories.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no directory is tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
