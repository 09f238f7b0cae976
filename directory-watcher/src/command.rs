//! Running the configured command on a file.

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Command;

use path_absolutize::Absolutize;
use tracing::debug;

use crate::error::{Result, WatcherError};

/// Something that processes one file at a time.
///
/// The scanner only marks a file as processed when `dispatch` returns `Ok`.
pub trait FileDispatcher {
    /// Process the file at the given absolute path.
    fn dispatch(&mut self, file: &Path) -> Result<()>;
}

impl<F> FileDispatcher for F
where
    F: FnMut(&Path) -> Result<()>,
{
    fn dispatch(&mut self, file: &Path) -> Result<()> {
        self(file)
    }
}

/// An external command with its static arguments.
///
/// The file path is appended as the last argument on every invocation.
/// stdout and stderr are inherited from the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandSpec {
    /// Build a command from what the user typed.
    ///
    /// An existing file is taken as a script and resolved to an absolute
    /// path. Anything else is split into words using shell quoting rules.
    pub fn resolve(raw: &str) -> Result<Self> {
        let candidate = Path::new(raw);
        if candidate.is_file() {
            let script = candidate.absolutize()?.into_owned();
            debug!("Using script {}", script.display());
            return Ok(Self {
                program: script.into_os_string(),
                args: Vec::new(),
            });
        }

        let argv = shlex::split(raw)
            .ok_or_else(|| WatcherError::InvalidCommand(format!("unbalanced quoting in '{raw}'")))?;
        Self::from_argv(argv)
    }

    /// Build a command from an explicit argument vector.
    pub fn from_argv<I, S>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv
            .next()
            .ok_or_else(|| WatcherError::InvalidCommand("empty command".to_string()))?;
        Ok(Self {
            program,
            args: argv.collect(),
        })
    }

    /// The executable.
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Static arguments placed before the file path.
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    fn command_for(&self, file: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(file);
        command
    }
}

impl FileDispatcher for CommandSpec {
    fn dispatch(&mut self, file: &Path) -> Result<()> {
        let program = self.program.to_string_lossy();
        let status = self.command_for(file).status().map_err(|e| {
            WatcherError::CommandInvocationFailed {
                file: file.to_path_buf(),
                reason: format!("failed to run {program}: {e}"),
            }
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(WatcherError::CommandInvocationFailed {
                file: file.to_path_buf(),
                reason: format!("{program} exited with {status}"),
            })
        }
    }
}
