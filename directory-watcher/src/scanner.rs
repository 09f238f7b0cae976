//! Change detection and dispatch for one pass over the watched directories.

use std::path::{Path, PathBuf};
use std::time::{Instant, UNIX_EPOCH};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cache::CacheStore;
use crate::command::FileDispatcher;
use crate::error::{Result, WatcherError};
use crate::filter::FileFilter;

/// Outcome of a pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    /// Directories that were seen for the first time or had a newer mtime.
    pub scanned: Vec<PathBuf>,

    /// Files the command processed successfully.
    pub dispatched: Vec<PathBuf>,

    /// Files whose command failed. They stay unprocessed.
    pub failed: Vec<PathBuf>,

    /// Directories skipped because they could not be read.
    pub unavailable: Vec<PathBuf>,

    /// Time taken in milliseconds.
    pub duration_ms: u64,
}

impl ScanReport {
    /// Whether the cache was modified and should be persisted.
    pub fn changed(&self) -> bool {
        !self.scanned.is_empty()
    }
}

/// Run one pass over `directories`, in order.
///
/// A directory is listed only when it is not yet in `store` or its mtime is
/// strictly newer than the cached one. Every candidate not yet processed is
/// handed to `dispatcher` and recorded on success. Directories that cannot be
/// read are skipped and retried on the next pass.
pub fn scan<D>(
    store: &mut CacheStore,
    directories: &[PathBuf],
    dispatcher: &mut D,
    filter: &FileFilter,
) -> ScanReport
where
    D: FileDispatcher + ?Sized,
{
    let start = Instant::now();
    let mut report = ScanReport::default();

    for dir in directories {
        if let Err(e) = scan_directory(store, dir, dispatcher, filter, &mut report) {
            warn!("Skipping directory for this pass: {e}");
            report.unavailable.push(dir.clone());
        }
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    if report.changed() {
        info!(
            "Scanned {} directories in {}ms (dispatched: {}, failed: {}, unavailable: {})",
            report.scanned.len(),
            report.duration_ms,
            report.dispatched.len(),
            report.failed.len(),
            report.unavailable.len()
        );
    }
    report
}

fn scan_directory<D>(
    store: &mut CacheStore,
    dir: &Path,
    dispatcher: &mut D,
    filter: &FileFilter,
    report: &mut ScanReport,
) -> Result<()>
where
    D: FileDispatcher + ?Sized,
{
    let current = modification_time(dir)?;

    if let Some(record) = store.get(dir) {
        if current <= record.last_modified {
            debug!("Unchanged: {}", dir.display());
            return Ok(());
        }
    } else {
        info!("New directory: {}", dir.display());
    }

    // Snapshot the listing before touching the cache or running anything.
    let candidates = list_candidates(dir, filter)?;
    let record = store.get_or_insert(dir);
    let mut failures = 0usize;

    for (name, path) in candidates {
        if record.is_processed(&name) {
            continue;
        }

        info!("Processing {}", path.display());
        match dispatcher.dispatch(&path) {
            Ok(()) => {
                record.mark_processed(name);
                report.dispatched.push(path);
            }
            Err(e) => {
                warn!("{e}");
                failures += 1;
                report.failed.push(path);
            }
        }
    }

    if failures == 0 {
        record.last_modified = current;
    } else {
        warn!(
            "{failures} file(s) in {} failed, will retry next pass",
            dir.display()
        );
    }

    report.scanned.push(dir.to_path_buf());
    Ok(())
}

/// Modification time of a directory in fractional seconds since the epoch.
pub fn modification_time(dir: &Path) -> Result<f64> {
    let unavailable = |source: std::io::Error| WatcherError::DirectoryUnavailable {
        path: dir.to_path_buf(),
        source,
    };

    let metadata = std::fs::metadata(dir).map_err(unavailable)?;
    if !metadata.is_dir() {
        return Err(unavailable(std::io::Error::new(
            std::io::ErrorKind::NotADirectory,
            "not a directory",
        )));
    }

    let modified = metadata.modified().map_err(unavailable)?;
    Ok(match modified.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    })
}

/// Regular files directly inside `dir` that pass `filter`, sorted by name.
///
/// Returns `(file name, absolute path)` pairs. Symlinks count when they point
/// at a regular file. Paths the filter ignores are left out.
pub fn list_candidates(dir: &Path, filter: &FileFilter) -> Result<Vec<(String, PathBuf)>> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    let mut candidates = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(WatcherError::DirectoryUnavailable {
                    path: dir.to_path_buf(),
                    source: e.into(),
                });
            }
            Err(e) => {
                debug!("Ignoring unreadable entry: {e}");
                continue;
            }
        };

        if !entry.file_type().is_file() || filter.is_ignored(entry.path()) {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            warn!("Ignoring non UTF-8 file name: {}", entry.path().display());
            continue;
        };

        if filter.is_candidate(name) {
            candidates.push((name.to_string(), entry.path().to_path_buf()));
        }
    }

    Ok(candidates)
}
