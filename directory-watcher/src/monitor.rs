//! A monitor session: cache, filter and dispatcher bound to one config.

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::cache::CacheStore;
use crate::command::FileDispatcher;
use crate::config::{WatchConfig, normalize_path};
use crate::error::Result;
use crate::filter::FileFilter;
use crate::scanner::{ScanReport, modification_time, scan};

/// Runs passes over the configured directories and persists the cache.
pub struct Monitor<D> {
    /// Session configuration.
    config: WatchConfig,

    /// Normalised watch list, in scan order.
    directories: Vec<PathBuf>,

    /// Compiled include/exclude patterns.
    filter: FileFilter,

    /// Runs the command for each new file.
    dispatcher: D,

    /// Processed-file cache.
    store: CacheStore,

    /// Watched directory holding the cache file, if any. Saving the cache
    /// bumps its mtime, which must not count as a change.
    cache_dir: Option<PathBuf>,

    /// Whether `store` differs from what is on disk.
    dirty: bool,

    /// Number of completed passes.
    passes: u64,
}

impl<D: FileDispatcher> Monitor<D> {
    /// Load the cache and prepare a session.
    ///
    /// Fails if the cache file exists but cannot be read or parsed, or if a
    /// pattern is invalid. With `trim_cache` set, entries for directories that
    /// are not watched anymore are dropped and the session starts dirty.
    pub fn open(config: WatchConfig, dispatcher: D) -> Result<Self> {
        let directories = config.normalized_directories()?;
        let cache_file = normalize_path(&config.cache_file)?;
        let filter = FileFilter::new(&config.include_patterns, &config.exclude_patterns)?
            .ignoring(&cache_file);
        let mut store = CacheStore::load(&config.cache_file)?;

        let cache_dir = cache_file
            .parent()
            .filter(|parent| directories.iter().any(|dir| dir == parent))
            .map(Path::to_path_buf);

        let dirty = config.trim_cache && !store.trim(&directories).is_empty();

        info!(
            "Watching {} directories, cache at {}",
            directories.len(),
            config.cache_file.display()
        );

        Ok(Self {
            config,
            directories,
            filter,
            dispatcher,
            store,
            cache_dir,
            dirty,
            passes: 0,
        })
    }

    /// Scan every directory once and save the cache if anything changed.
    ///
    /// The pass's work is kept even when saving fails; the error is returned
    /// and the next pass tries to save again.
    pub fn run_pass(&mut self) -> Result<ScanReport> {
        let report = scan(
            &mut self.store,
            &self.directories,
            &mut self.dispatcher,
            &self.filter,
        );
        self.passes += 1;
        self.dirty |= report.changed();
        self.persist()?;
        Ok(report)
    }

    /// Repeat passes every `poll_interval` until `shutdown` completes.
    ///
    /// Recoverable errors, such as failing to save the cache, are logged and
    /// do not stop the loop. A last save is attempted on the way out if the
    /// cache is still dirty.
    pub async fn run_daemon<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Polling every {:?}", self.config.poll_interval);

        loop {
            match self.run_pass() {
                Ok(_) => {}
                Err(e) if e.is_recoverable() => {
                    error!("Pass {} could not save the cache: {e}", self.passes);
                }
                Err(e) => return Err(e),
            }

            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutting down after {} passes", self.passes);
                    break;
                }
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        if !self.dirty {
            debug!("Cache unchanged, not saving");
            return Ok(());
        }

        let settled = self.settled_cache_dir();
        self.store.save(&self.config.cache_file)?;
        self.dirty = false;

        if let Some(dir) = settled {
            self.absorb_own_write(&dir);
        }
        Ok(())
    }

    /// The cache directory, if it is watched and nothing changed in it since
    /// its recorded scan.
    fn settled_cache_dir(&self) -> Option<PathBuf> {
        let dir = self.cache_dir.as_deref()?;
        let recorded = self.store.get(dir)?.last_modified;
        let current = modification_time(dir).ok()?;
        (current == recorded).then(|| dir.to_path_buf())
    }

    /// Record the mtime left by our own save so the next pass skips it.
    fn absorb_own_write(&mut self, dir: &Path) {
        let current = match modification_time(dir) {
            Ok(current) => current,
            Err(e) => {
                debug!("Cannot refresh cache directory mtime: {e}");
                return;
            }
        };
        if let Some(record) = self.store.get_mut(dir) {
            record.last_modified = current;
        }
    }

    /// The processed-file cache.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// The normalised watch list.
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// The session configuration.
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Number of passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }
}
