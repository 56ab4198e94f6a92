//! External command execution.
//!
//! Commands are always built as explicit argument vectors and executed
//! without a shell, so resource names and template options are never
//! interpolated into a command line.

use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use crate::error::{CommandError, Result};

/// Privilege escalation wrapper for privileged commands.
const SUDO: &str = "sudo";

/// An external command as an explicit argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name, looked up on `PATH` at run time.
    pub program: String,
    /// Arguments, passed verbatim.
    pub args: Vec<String>,
    /// Whether the command needs elevated privileges.
    pub privileged: bool,
}

/// Captured result of a command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Runs external commands.
///
/// Implementations return `Err` only when the command could not be launched;
/// a non-zero exit is reported through [`CommandOutput::exit_code`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion and captures its output.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands on the local system with `tokio::process`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    /// Prefix privileged commands with `sudo`.
    use_sudo: bool,
}

impl CommandSpec {
    /// Creates an unprivileged command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            privileged: false,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Marks the command as requiring elevated privileges.
    #[must_use]
    pub const fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }
}

impl CommandOutput {
    /// Creates a successful output with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Creates an output with the given exit code, stdout and stderr.
    #[must_use]
    pub fn with_status(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// Returns stdout followed by stderr.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }

    /// Returns the trimmed combined output, or the exit status when both streams are empty.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let text = self.combined();
        let text = text.trim();
        if !text.is_empty() {
            return text.to_string();
        }
        self.exit_code.map_or_else(
            || String::from("terminated by signal"),
            |code| format!("exit status {code}"),
        )
    }
}

impl SystemRunner {
    /// Creates a runner.
    #[must_use]
    pub const fn new(use_sudo: bool) -> Self {
        Self { use_sudo }
    }

    /// Resolves a program on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::ToolNotFound`] if the program cannot be found.
    pub fn resolve(program: &str) -> Result<PathBuf> {
        which::which(program).map_err(|e| {
            CommandError::ToolNotFound {
                program: program.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Builds the executable path and argument vector for a spec.
    ///
    /// Privileged commands run through `sudo` with the bare program name so
    /// that sudo's own secure path applies.
    fn build(&self, spec: &CommandSpec) -> Result<(PathBuf, Vec<OsString>)> {
        if spec.privileged && self.use_sudo {
            let sudo = Self::resolve(SUDO)?;
            let mut args = Vec::with_capacity(spec.args.len() + 1);
            args.push(OsString::from(&spec.program));
            args.extend(spec.args.iter().map(OsString::from));
            return Ok((sudo, args));
        }

        let program = Self::resolve(&spec.program)?;
        Ok((program, spec.args.iter().map(OsString::from).collect()))
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let (program, args) = self.build(spec)?;
        debug!("Running: {} {:?}", program.display(), args);

        let output = Command::new(&program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!("{} exited with {:?}", spec.program, result.exit_code);
        Ok(result)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.privileged {
            write!(f, "{SUDO} ")?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_builder() {
        let spec = CommandSpec::new("lxc-start")
            .args(["-n", "web01"])
            .arg("--daemon")
            .privileged();
        assert_eq!(spec.program, "lxc-start");
        assert_eq!(spec.args, vec!["-n", "web01", "--daemon"]);
        assert!(spec.privileged);
        assert_eq!(spec.to_string(), "sudo lxc-start -n web01 --daemon");
    }

    #[test]
    fn test_hostile_name_stays_one_argument() {
        let spec = CommandSpec::new("a2ensite").arg("x; rm -rf /");
        assert_eq!(spec.args.len(), 1);
        assert_eq!(spec.args[0], "x; rm -rf /");
    }

    #[test]
    fn test_output_combined_and_diagnostic() {
        let out = CommandOutput::with_status(1, "partial\n", "error: boom\n");
        assert!(!out.success());
        assert_eq!(out.combined(), "partial\nerror: boom\n");
        assert_eq!(out.diagnostic(), "partial\nerror: boom");

        let silent = CommandOutput::with_status(3, "", "");
        assert_eq!(silent.diagnostic(), "exit status 3");

        assert!(CommandOutput::ok("fine").success());
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let runner = SystemRunner::new(false);
        let spec = CommandSpec::new("definitely-not-a-real-binary-4c1e");
        let err = runner.run(&spec).await.unwrap_err();
        assert!(err.is_tooling_failure());
        assert!(err.to_string().contains("definitely-not-a-real-binary-4c1e"));
    }
}
