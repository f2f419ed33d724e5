//! covgate - coverage gate for Istanbul/Jest reports
//!
//! A library for gating a test run on its coverage:
//! - Loading `coverage-summary.json`, falling back to `coverage-final.json`
//! - Folding raw per-file hit counts into statement, branch, function and line totals
//! - Checking a configurable set of metrics against one threshold
//! - Rendering a fixed-width table and mapping the verdict to an exit code

pub mod config;
pub mod coverage;
pub mod error;
pub mod execution;
pub mod outcome;
pub mod report;
pub mod task;

pub use config::{Config, Overrides, Settings};
pub use coverage::{AggregateReport, GateConfig, GateResult, Metric, MetricCount};
pub use error::GateError;
pub use execution::{Evaluation, RunOptions, Runner};
pub use outcome::{Outcome, FATAL_EXIT_CODE};
pub use task::{CommandExecutor, ShellExecutor};
