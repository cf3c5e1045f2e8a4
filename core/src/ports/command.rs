//! External command port (interface).

use std::path::PathBuf;

use crate::error::Result;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited with status 0.
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Port for invoking locally-installed CLIs (container runtimes, systemctl,
/// ss, lsof, ps).
///
/// Tests inject a deterministic fake instead of spawning subprocesses.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and capture its output.
    ///
    /// A non-zero exit status is not an error; failing to spawn is.
    fn run(
        &self,
        program: &str,
        args: &[&str],
    ) -> impl std::future::Future<Output = Result<CommandOutput>> + Send;

    /// Resolve `program` on the search path.
    fn lookup(&self, program: &str) -> Option<PathBuf>;

    /// Whether `program` is installed.
    fn is_available(&self, program: &str) -> bool {
        self.lookup(program).is_some()
    }
}

impl<T: CommandRunner> CommandRunner for std::sync::Arc<T> {
    fn run(
        &self,
        program: &str,
        args: &[&str],
    ) -> impl std::future::Future<Output = Result<CommandOutput>> + Send {
        (**self).run(program, args)
    }

    fn lookup(&self, program: &str) -> Option<PathBuf> {
        (**self).lookup(program)
    }
}
