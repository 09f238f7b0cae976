//! Configuration types for directory watching.

use std::path::{Path, PathBuf};
use std::time::Duration;

use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// File name of the cache when no location is given.
pub const DEFAULT_CACHE_FILE_NAME: &str = "monitor.tmp";

/// Pause between passes in daemon mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Immutable settings for a monitor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Where the processed-file cache is persisted.
    pub cache_file: PathBuf,

    /// Directories to scan, in scan order. Empty means the current directory.
    pub directories: Vec<PathBuf>,

    /// Globs a file name must match to be dispatched.
    pub include_patterns: Vec<String>,

    /// Globs that keep a file from being dispatched unless it is included.
    pub exclude_patterns: Vec<String>,

    /// Drop cache entries for directories that are no longer watched.
    pub trim_cache: bool,

    /// Single pass or daemon loop.
    pub mode: RunMode,

    /// Pause between daemon passes.
    pub poll_interval: Duration,
}

impl WatchConfig {
    /// Create a config watching the given directories.
    pub fn new<I, P>(directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            cache_file: default_cache_file(),
            directories: directories.into_iter().map(Into::into).collect(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            trim_cache: false,
            mode: RunMode::Once,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the cache file location.
    pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = path.into();
        self
    }

    /// Add an include pattern.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include_patterns.push(pattern.into());
        self
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Enable cache trimming.
    pub fn trim_cache(mut self) -> Self {
        self.trim_cache = true;
        self
    }

    /// Set the run mode.
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the daemon poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Watched directories as absolute, normalised paths.
    ///
    /// Falls back to the current directory when none are configured and
    /// drops repeated entries while keeping the first occurrence's order.
    /// Paths that are not valid UTF-8 cannot be cache keys and are skipped.
    pub fn normalized_directories(&self) -> Result<Vec<PathBuf>> {
        let configured = if self.directories.is_empty() {
            vec![std::env::current_dir()?]
        } else {
            self.directories.clone()
        };

        let mut seen = Vec::with_capacity(configured.len());
        for dir in &configured {
            let dir = normalize_path(dir)?;
            if dir.to_str().is_none() {
                warn!("Not watching non UTF-8 directory: {}", dir.display());
                continue;
            }
            if !seen.contains(&dir) {
                seen.push(dir);
            }
        }
        Ok(seen)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new(Vec::<PathBuf>::new())
    }
}

/// How the monitor runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One pass, then exit.
    #[default]
    Once,

    /// Repeat passes until interrupted.
    Daemon,
}

/// Cache location used when none is configured.
pub fn default_cache_file() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_CACHE_FILE_NAME)
}

/// Make a path absolute and strip `.`/`..` and trailing separators.
///
/// Purely lexical: the path does not have to exist.
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    Ok(path.absolutize()?.into_owned())
}
