//! Base command execution abstraction
//!
//! Provides the foundational trait for running dependency-manager and git
//! commands in a chosen working directory, enabling dependency injection for
//! testing.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }

    /// Stdout and stderr merged, the way the output is surfaced in skip logs.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

#[derive(Debug, Error, Clone)]
pub enum CommandError {
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },
    #[error("IO error: {message}")]
    Io { message: String },
}

/// Trait for executing external commands
///
/// The resolvers shell out to dependency managers through this trait, and the
/// bundler reverts touched files with it. Mock implementations keep those
/// paths testable without spawning processes.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(
        &self,
        program: &str,
        args: &[&str],
        dir: &Path,
    ) -> Result<CommandOutput, CommandError>;
}

/// Real implementation using std::process::Command
pub struct ProcessCommandExecutor;

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(
        &self,
        program: &str,
        args: &[&str],
        dir: &Path,
    ) -> Result<CommandOutput, CommandError> {
        use std::process::Command;

        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CommandError::CommandNotFound {
                        command: program.to_string(),
                    }
                } else {
                    CommandError::Io {
                        message: e.to_string(),
                    }
                }
            })?;

        Ok(CommandOutput {
            status_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_process_command_executor_success() {
        let executor = ProcessCommandExecutor;
        let result = executor.execute("echo", &["hello"], Path::new(".")).await;

        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_process_command_executor_command_not_found() {
        let executor = ProcessCommandExecutor;
        let result = executor
            .execute("nonexistent_command_xyz", &[], Path::new("."))
            .await;

        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            CommandError::CommandNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_process_command_executor_respects_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let executor = ProcessCommandExecutor;
        let result = executor.execute("pwd", &[], dir.path()).await.unwrap();

        assert!(result.success());
        let reported = std::path::PathBuf::from(result.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_combined_output_merges_streams() {
        let output = CommandOutput {
            status_code: 1,
            stdout: "go: module not found".to_string(),
            stderr: "exit status 1".to_string(),
        };
        assert_eq!(output.combined(), "go: module not found\nexit status 1");
    }
}
