use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use monitor_directory_watcher::config::default_cache_file;
use monitor_directory_watcher::{RunMode, WatchConfig};

/// Run a command on every new file that appears in a set of directories.
#[derive(Parser, Debug)]
#[command(name = "monitor", version, about, long_about = None)]
pub struct Cli {
    /// Keep polling until interrupted instead of running a single pass
    #[arg(short, long)]
    pub daemon: bool,

    /// Where the processed-file cache is kept
    #[arg(long, alias = "temp-file", value_name = "PATH", default_value_os_t = default_cache_file())]
    pub cache_file: PathBuf,

    /// Forget cached directories that are not in this invocation's list
    #[arg(long)]
    pub trim_cache: bool,

    /// Only dispatch files whose name matches this glob (repeatable)
    #[arg(short, long = "include", value_name = "GLOB")]
    pub include: Vec<String>,

    /// Skip files whose name matches this glob unless included (repeatable)
    #[arg(short, long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Seconds between passes in daemon mode
    #[arg(long, value_name = "SECS", default_value = "1", value_parser = parse_interval)]
    pub interval: Duration,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Script path or command line; the file path is appended as the last argument
    pub command: String,

    /// Directories to watch [default: current directory]
    pub directories: Vec<PathBuf>,
}

impl Cli {
    /// Build the session configuration from the parsed arguments.
    pub fn to_config(&self) -> WatchConfig {
        let mode = if self.daemon {
            RunMode::Daemon
        } else {
            RunMode::Once
        };

        let mut config = WatchConfig::new(self.directories.iter())
            .with_cache_file(&self.cache_file)
            .with_mode(mode)
            .with_poll_interval(self.interval);
        config.include_patterns = self.include.clone();
        config.exclude_patterns = self.exclude.clone();
        config.trim_cache = self.trim_cache;
        config
    }

    /// Default log filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn parse_interval(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number of seconds"))?;
    if secs <= 0.0 {
        return Err("interval must be greater than zero".to_string());
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}
