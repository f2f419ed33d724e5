//! Error types for the gate pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop the pipeline before a gate verdict exists
#[derive(Debug, Error)]
pub enum GateError {
    #[error("dependency install failed: {}", describe_install(.primary, .fallback))]
    DependencyInstallFailed {
        primary: String,
        fallback: Option<String>,
    },

    #[error("test run failed: `{command}` {}", describe_exit(.code))]
    TestRunFailed { command: String, code: Option<i32> },

    #[error("no coverage data found (looked for {})", display_paths(.searched))]
    NoCoverageData { searched: Vec<PathBuf> },

    #[error("malformed coverage report {}: {source}", .path.display())]
    MalformedReport {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GateError {
    /// Pipeline stage that failed, for the one-line diagnostic
    pub fn stage(&self) -> &'static str {
        match self {
            Self::DependencyInstallFailed { .. } => "install",
            Self::TestRunFailed { .. } | Self::Spawn { .. } => "test",
            Self::NoCoverageData { .. } | Self::MalformedReport { .. } | Self::Io { .. } => {
                "coverage"
            }
        }
    }
}

fn describe_install(primary: &str, fallback: &Option<String>) -> String {
    match fallback {
        Some(fallback) => format!("`{}` and fallback `{}` both failed", primary, fallback),
        None => format!("`{}` failed and no fallback is configured", primary),
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, GateError>;
