//! Subprocess seam for package-manager backends.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// A command line to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,
    /// Arguments, passed verbatim.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Runs package-manager commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Resolve `program` on `PATH`.
    fn which(&self, program: &str) -> Option<PathBuf>;

    /// Run with inherited stdio; `Ok(true)` on a zero exit.
    ///
    /// # Errors
    ///
    /// Fails if the program cannot be spawned.
    async fn run(&self, cmd: &CommandSpec) -> io::Result<bool>;

    /// Run silently as a yes/no check; `Ok(true)` on a zero exit.
    ///
    /// # Errors
    ///
    /// Fails if the program cannot be spawned.
    async fn check(&self, cmd: &CommandSpec) -> io::Result<bool>;
}

/// Runs commands on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    fn which(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    async fn run(&self, cmd: &CommandSpec) -> io::Result<bool> {
        tracing::info!(command = %cmd, "running");
        let status = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await?;
        Ok(status.success())
    }

    async fn check(&self, cmd: &CommandSpec) -> io::Result<bool> {
        tracing::debug!(command = %cmd, "checking");
        let status = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        Ok(status.success())
    }
}
