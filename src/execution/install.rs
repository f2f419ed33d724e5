//! Dependency installation with a single fallback

use colored::Colorize;
use std::path::Path;

use crate::error::{GateError, Result};
use crate::task::{CommandExecutor, TaskResult};

/// Primary install command and the one alternative tried after it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCommands {
    pub primary: String,
    pub fallback: Option<String>,
}

/// Run the primary install; on failure run the fallback exactly once.
///
/// No further retries and no backoff.
pub fn install_dependencies<E: CommandExecutor + ?Sized>(
    executor: &E,
    commands: &InstallCommands,
    cwd: &Path,
) -> Result<TaskResult> {
    match executor.execute(&commands.primary, cwd) {
        Ok(result) if result.success => return Ok(result),
        Ok(result) => log::debug!("`{}` exited with {:?}", commands.primary, result.code),
        Err(e) => log::debug!("`{}` could not run: {}", commands.primary, e),
    }

    let failed = || GateError::DependencyInstallFailed {
        primary: commands.primary.clone(),
        fallback: commands.fallback.clone(),
    };

    let Some(ref fallback) = commands.fallback else {
        return Err(failed());
    };

    eprintln!(
        "{} `{}` failed; trying `{}`...",
        "⚠".yellow(),
        commands.primary,
        fallback.cyan()
    );

    match executor.execute(fallback, cwd) {
        Ok(result) if result.success => Ok(result),
        Ok(_) => Err(failed()),
        Err(e) => {
            log::debug!("`{}` could not run: {}", fallback, e);
            Err(failed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    /// Succeeds for every command not listed as failing
    struct Scripted {
        failing: HashSet<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn failing(cmds: &[&'static str]) -> Self {
            Self {
                failing: cmds.iter().copied().collect(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandExecutor for Scripted {
        fn execute(&self, cmd: &str, _cwd: &Path) -> Result<TaskResult> {
            self.calls.borrow_mut().push(cmd.to_string());
            let success = !self.failing.contains(cmd);
            Ok(TaskResult {
                command: cmd.to_string(),
                success,
                code: Some(if success { 0 } else { 1 }),
                duration_ms: 0,
            })
        }
    }

    fn npm() -> InstallCommands {
        InstallCommands {
            primary: "npm ci".to_string(),
            fallback: Some("npm install".to_string()),
        }
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let executor = Scripted::failing(&[]);
        install_dependencies(&executor, &npm(), Path::new(".")).unwrap();
        assert_eq!(*executor.calls.borrow(), vec!["npm ci"]);
    }

    #[test]
    fn test_fallback_after_primary_failure() {
        let executor = Scripted::failing(&["npm ci"]);
        let result = install_dependencies(&executor, &npm(), Path::new(".")).unwrap();
        assert_eq!(result.command, "npm install");
        assert_eq!(*executor.calls.borrow(), vec!["npm ci", "npm install"]);
    }

    #[test]
    fn test_fallback_tried_exactly_once() {
        let executor = Scripted::failing(&["npm ci", "npm install"]);
        let err = install_dependencies(&executor, &npm(), Path::new(".")).unwrap_err();
        assert!(matches!(err, GateError::DependencyInstallFailed { .. }));
        assert_eq!(executor.calls.borrow().len(), 2);
    }

    #[test]
    fn test_no_fallback_configured() {
        let executor = Scripted::failing(&["npm ci"]);
        let commands = InstallCommands {
            fallback: None,
            ..npm()
        };
        let err = install_dependencies(&executor, &commands, Path::new(".")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "dependency install failed: `npm ci` failed and no fallback is configured"
        );
    }
}
