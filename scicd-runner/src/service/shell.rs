//! Shell command execution
//!
//! Phase commands are arbitrary shell strings run without any sandboxing.
//! Everything that executes them goes through [`CommandExecutor`].

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout followed by stderr, trailing whitespace removed
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim_end();
        let stderr = self.stderr.trim_end();
        match (stdout.is_empty(), stderr.is_empty()) {
            (_, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (false, false) => format!("{}\n{}", stdout, stderr),
        }
    }
}

/// Runs a single command string to completion
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Executes `command` and waits for it to exit
    ///
    /// A non-zero exit is reported through [`CommandOutput`], not as an
    /// error. Errors mean the command could not be run at all.
    async fn execute(&self, command: &str) -> std::io::Result<CommandOutput>;
}

/// Executes commands through `<shell> -c <command>`
pub struct ShellExecutor {
    shell: String,
    working_dir: Option<PathBuf>,
}

impl ShellExecutor {
    /// Creates an executor for the given shell binary (e.g. "sh")
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            working_dir: None,
        }
    }

    /// Runs every command from `dir` instead of the current directory
    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, command: &str) -> std::io::Result<CommandOutput> {
        let mut process = Command::new(&self.shell);
        process
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            process.current_dir(dir);
        }

        let output = process.output().await?;

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        debug!(
            "Command finished: exit_code={:?}, stdout_len={}, stderr_len={}",
            result.exit_code,
            result.stdout.len(),
            result.stderr.len()
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let output = ShellExecutor::new("sh").execute("echo hi").await.unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, "hi\n");
        assert_eq!(output.combined(), "hi");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let output = ShellExecutor::new("sh")
            .execute("echo oops >&2; exit 3")
            .await
            .unwrap();

        assert!(!output.success());
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.combined(), "oops");
    }

    #[tokio::test]
    async fn test_combined_output_keeps_both_streams() {
        let output = ShellExecutor::new("sh")
            .execute("echo out; echo err >&2")
            .await
            .unwrap();

        assert_eq!(output.combined(), "out\nerr");
    }

    #[tokio::test]
    async fn test_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let executor =
            ShellExecutor::new("sh").with_working_dir(Some(dir.path().to_path_buf()));

        executor.execute("touch marker").await.unwrap();

        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn test_missing_shell_is_an_error() {
        let result = ShellExecutor::new("/nonexistent/shell").execute("true").await;
        assert!(result.is_err());
    }
}
