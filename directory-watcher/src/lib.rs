//! # Directory Watcher
//!
//! Polls a list of directories and runs a command once for every new file,
//! remembering what it has processed in a JSON cache so restarts do not
//! repeat work.
//!
//! ## Features
//!
//! - **Change Detection**: a directory is only listed when its mtime advances
//! - **Processed Sets**: per-directory record of files already dispatched
//! - **Include/Exclude Globs**: filter candidate file names
//! - **Daemon Mode**: repeat passes on a fixed interval until shutdown
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Directory Watcher                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  WatchConfig ──► Monitor ──► scan ──► FileDispatcher            │
//! │                     │          │                                │
//! │                     ▼          ▼                                │
//! │                CacheStore   FileFilter                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod filter;
pub mod monitor;
pub mod scanner;

pub use cache::{CacheStore, DirectoryRecord};
pub use command::{CommandSpec, FileDispatcher};
pub use config::{RunMode, WatchConfig};
pub use error::{Result, WatcherError};
pub use filter::FileFilter;
pub use monitor::Monitor;
pub use scanner::{ScanReport, scan};
