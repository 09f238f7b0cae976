//! `monitor` - run a command on every new file in a set of directories.
//!
//! Usage: monitor [OPTIONS] <COMMAND> [DIRECTORIES]...
//!
//! Without `--daemon` a single pass is made and the process exits; a fatal
//! error (unreadable cache, failure to save it) gives a non-zero exit status.

use anyhow::{Context, Result};
use clap::Parser;
use monitor_directory_watcher::{CommandSpec, Monitor, RunMode};
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
use cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .init();

    let command = CommandSpec::resolve(&cli.command)
        .with_context(|| format!("cannot use '{}' as a command", cli.command))?;
    debug!("Resolved command: {command:?}");

    let config = cli.to_config();
    let cache_file = config.cache_file.clone();
    let mut monitor = Monitor::open(config, command)
        .with_context(|| format!("failed to start with cache {}", cache_file.display()))?;
    for dir in monitor.directories() {
        debug!("Watching {}", dir.display());
    }

    match monitor.config().mode {
        RunMode::Once => {
            monitor.run_pass()?;
        }
        RunMode::Daemon => {
            monitor.run_daemon(shutdown_signal()).await?;
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed the daemon keeps
/// running until killed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
