//! External command execution

use colored::Colorize;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

use crate::error::{GateError, Result};

/// Result of executing a command
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub command: String,
    pub success: bool,
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub duration_ms: u128,
}

/// Runs external commands for the pipeline
pub trait CommandExecutor {
    fn execute(&self, cmd: &str, cwd: &Path) -> Result<TaskResult>;
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    fn execute(&self, cmd: &str, cwd: &Path) -> Result<TaskResult> {
        (**self).execute(cmd, cwd)
    }
}

/// Runs commands through the platform shell with inherited stdio
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

impl CommandExecutor for ShellExecutor {
    fn execute(&self, cmd: &str, cwd: &Path) -> Result<TaskResult> {
        println!("\n{} {}", "$".dimmed(), cmd.bold());

        let start = Instant::now();
        let status = shell_command(cmd)
            .current_dir(cwd)
            .status()
            .map_err(|source| GateError::Spawn {
                command: cmd.to_string(),
                source,
            })?;

        let result = TaskResult {
            command: cmd.to_string(),
            success: status.success(),
            code: status.code(),
            duration_ms: start.elapsed().as_millis(),
        };

        log::debug!(
            "`{}` finished in {}ms with {:?}",
            cmd,
            result.duration_ms,
            result.code
        );

        Ok(result)
    }
}

#[cfg(windows)]
fn shell_command(cmd: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", cmd]);
    command
}

#[cfg(not(windows))]
fn shell_command(cmd: &str) -> Command {
    let mut command = Command::new("sh");
    command.args(["-c", cmd]);
    command
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_successful_command() {
        let temp_dir = TempDir::new().unwrap();
        let result = ShellExecutor.execute("true", temp_dir.path()).unwrap();
        assert!(result.success);
        assert_eq!(result.code, Some(0));
    }

    #[test]
    fn test_failing_command_keeps_exit_code() {
        let temp_dir = TempDir::new().unwrap();
        let result = ShellExecutor.execute("exit 7", temp_dir.path()).unwrap();
        assert!(!result.success);
        assert_eq!(result.code, Some(7));
    }

    #[test]
    fn test_runs_in_working_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = ShellExecutor
            .execute("touch marker.txt", temp_dir.path())
            .unwrap();
        assert!(result.success);
        assert!(temp_dir.path().join("marker.txt").exists());
    }

    #[test]
    fn test_missing_directory_is_spawn_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(matches!(
            ShellExecutor.execute("true", &missing),
            Err(GateError::Spawn { .. })
        ));
    }
}
