//! Shell command execution for client CLIs.

use std::process::Command;

use anyhow::Context;

use crate::error::McpError;

/// Captured result of one command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Typed error for a failed run of `command`.
    pub fn to_error(&self, command: &str) -> McpError {
        McpError::CommandExecutionFailure {
            command: command.to_string(),
            status: self
                .code
                .map(|code| format!("exit code {}", code))
                .unwrap_or_else(|| "terminated by signal".to_string()),
            stderr: self.stderr.trim().to_string(),
        }
    }
}

/// Runs a full command line through the platform shell.
///
/// An error means the shell itself could not be started; a command that ran
/// and failed is reported through [`CommandOutput::code`].
pub trait CommandRunner: Send + Sync + std::fmt::Debug {
    fn run(&self, command_line: &str) -> anyhow::Result<CommandOutput>;
}

/// Runner backed by `sh -c` (or `cmd /C` on Windows).
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command_line: &str) -> anyhow::Result<CommandOutput> {
        tracing::debug!("Running `{}`", command_line);
        let output = shell_command(command_line)
            .output()
            .with_context(|| format!("Failed to start shell for `{}`", command_line))?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(command_line);
    command
}

#[cfg(not(windows))]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(command_line);
    command
}
