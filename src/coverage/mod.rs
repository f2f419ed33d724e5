//! Coverage module
//!
//! Provides:
//! - The per-metric record model
//! - Istanbul `json-summary` loading
//! - Istanbul `coverage-final.json` aggregation
//! - Ordered loader strategies
//! - Threshold gating

mod istanbul;
mod source;
mod summary;
mod threshold;

pub use istanbul::*;
pub use source::*;
pub use summary::*;
pub use threshold::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A coverage dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Statements,
    Branches,
    Functions,
    Lines,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Statements,
        Metric::Branches,
        Metric::Functions,
        Metric::Lines,
    ];

    /// Key used by Istanbul reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Statements => "statements",
            Metric::Branches => "branches",
            Metric::Functions => "functions",
            Metric::Lines => "lines",
        }
    }

    /// Capitalized name for tables
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Statements => "Statements",
            Metric::Branches => "Branches",
            Metric::Functions => "Functions",
            Metric::Lines => "Lines",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "Unknown metric: {}. Supported: statements, branches, functions, lines",
                    s
                )
            })
    }
}

/// Covered and total units for one metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricCount {
    covered: u64,
    total: u64,
}

impl MetricCount {
    /// `covered` is clamped to `total`
    pub fn new(covered: u64, total: u64) -> Self {
        Self {
            covered: covered.min(total),
            total,
        }
    }

    pub fn covered(&self) -> u64 {
        self.covered
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Count one unit, covered when `hits > 0`
    pub fn record(&mut self, hits: u64) {
        self.total += 1;
        if hits > 0 {
            self.covered += 1;
        }
    }

    /// Percentage rounded to two decimals; nothing to cover is 100%
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        round2(self.covered as f64 / self.total as f64 * 100.0)
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-metric percentages, `None` when a metric could not be determined
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateReport {
    metrics: BTreeMap<Metric, Option<f64>>,
}

impl AggregateReport {
    /// Report with every metric undetermined
    pub fn empty() -> Self {
        Self {
            metrics: Metric::ALL.into_iter().map(|m| (m, None)).collect(),
        }
    }

    pub fn with(mut self, metric: Metric, pct: Option<f64>) -> Self {
        self.metrics.insert(metric, pct);
        self
    }

    pub fn from_counts(counts: &CoverageTotals) -> Self {
        Metric::ALL
            .into_iter()
            .fold(Self::empty(), |report, m| {
                report.with(m, Some(counts.get(m).percentage()))
            })
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied().flatten()
    }

    /// Metrics in report order
    pub fn iter(&self) -> impl Iterator<Item = (Metric, Option<f64>)> + '_ {
        self.metrics.iter().map(|(m, pct)| (*m, *pct))
    }
}

/// Folded counts for all four metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageTotals {
    pub statements: MetricCount,
    pub branches: MetricCount,
    pub functions: MetricCount,
    pub lines: MetricCount,
}

impl CoverageTotals {
    pub fn get(&self, metric: Metric) -> MetricCount {
        match metric {
            Metric::Statements => self.statements,
            Metric::Branches => self.branches,
            Metric::Functions => self.functions,
            Metric::Lines => self.lines,
        }
    }
}
