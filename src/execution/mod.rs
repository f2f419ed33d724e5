//! Execution module
//!
//! Provides:
//! - Dependency installation with one fallback
//! - The gate pipeline runner

pub mod install;
pub mod runner;

pub use install::{install_dependencies, InstallCommands};
pub use runner::{Evaluation, RunOptions, Runner};
