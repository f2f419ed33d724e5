//! Ordered coverage sources: the first one that finds data wins

use std::path::{Path, PathBuf};

use super::{load_final, load_summary, AggregateOptions, AggregateReport};
use crate::error::{GateError, Result};

/// A place coverage percentages can be loaded from
pub trait CoverageSource {
    /// Short name for console output
    fn name(&self) -> &str;

    fn path(&self) -> &Path;

    /// `Ok(None)` when the artifact is absent
    fn load(&self) -> Result<Option<AggregateReport>>;
}

/// Pre-aggregated `coverage-summary.json`
#[derive(Debug, Clone)]
pub struct SummarySource {
    path: PathBuf,
}

impl SummarySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CoverageSource for SummarySource {
    fn name(&self) -> &str {
        "summary"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<AggregateReport>> {
        load_summary(&self.path)
    }
}

/// Raw per-file `coverage-final.json`
#[derive(Debug, Clone)]
pub struct RawSource {
    path: PathBuf,
    options: AggregateOptions,
}

impl RawSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: AggregateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AggregateOptions) -> Self {
        self.options = options;
        self
    }
}

impl CoverageSource for RawSource {
    fn name(&self) -> &str {
        "raw"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<AggregateReport>> {
        load_final(&self.path, self.options)
    }
}

/// Report plus the artifact it came from
#[derive(Debug, Clone)]
pub struct LoadedCoverage {
    pub source: PathBuf,
    pub report: AggregateReport,
}

/// Try each source in order and stop at the first hit.
///
/// A malformed artifact stops the chain; it is never skipped in favour of
/// a later source.
pub fn load_first(sources: &[Box<dyn CoverageSource>]) -> Result<LoadedCoverage> {
    for source in sources {
        log::debug!("trying {} coverage at {}", source.name(), source.path().display());

        if let Some(report) = source.load()? {
            return Ok(LoadedCoverage {
                source: source.path().to_path_buf(),
                report,
            });
        }
    }

    Err(GateError::NoCoverageData {
        searched: sources.iter().map(|s| s.path().to_path_buf()).collect(),
    })
}

/// The standard chain for a coverage directory: summary, then raw
pub fn default_sources(
    dir: &Path,
    summary: &str,
    raw: &str,
    options: AggregateOptions,
) -> Vec<Box<dyn CoverageSource>> {
    vec![
        Box::new(SummarySource::new(dir.join(summary))),
        Box::new(RawSource::new(dir.join(raw)).with_options(options)),
    ]
}
