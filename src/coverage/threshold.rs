//! Coverage threshold validation

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::{round2, AggregateReport, Metric};

pub const DEFAULT_THRESHOLD: f64 = 80.0;

/// Threshold and the metrics it applies to
#[derive(Debug, Clone, PartialEq)]
pub struct GateConfig {
    pub threshold: f64,
    pub gated_metrics: BTreeSet<Metric>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            gated_metrics: [Metric::Statements, Metric::Lines].into_iter().collect(),
        }
    }
}

impl GateConfig {
    pub fn new(threshold: f64, gated_metrics: impl IntoIterator<Item = Metric>) -> Self {
        Self {
            threshold,
            gated_metrics: gated_metrics.into_iter().collect(),
        }
    }

    pub fn is_gated(&self, metric: Metric) -> bool {
        self.gated_metrics.contains(&metric)
    }
}

/// A report split into gated and informational metrics
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSelection {
    pub gated: Vec<(Metric, Option<f64>)>,
    pub informational: Vec<(Metric, Option<f64>)>,
}

/// Split the report by the configured gate set.
///
/// A gated metric missing from the report is still selected, as undetermined.
pub fn select_metrics(report: &AggregateReport, config: &GateConfig) -> MetricSelection {
    let gated = config
        .gated_metrics
        .iter()
        .map(|m| (*m, report.get(*m)))
        .collect();

    let informational = report
        .iter()
        .filter(|(m, _)| !config.is_gated(*m))
        .collect();

    MetricSelection {
        gated,
        informational,
    }
}

/// Verdict for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricOutcome {
    pub actual: Option<f64>,
    pub threshold: f64,
    pub pass: bool,
    /// Counts towards the overall verdict
    pub gated: bool,
}

impl MetricOutcome {
    /// Distance to the threshold, negative when short
    pub fn delta(&self) -> Option<f64> {
        self.actual.map(|actual| round2(actual - self.threshold))
    }
}

/// Result of threshold validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateResult {
    pub per_metric: BTreeMap<Metric, MetricOutcome>,
    pub overall_pass: bool,
}

impl GateResult {
    pub fn failed_metrics(&self) -> impl Iterator<Item = (Metric, &MetricOutcome)> {
        self.per_metric
            .iter()
            .filter(|(_, o)| o.gated && !o.pass)
            .map(|(m, o)| (*m, o))
    }

    pub fn gated_metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        self.per_metric
            .iter()
            .filter(|(_, o)| o.gated)
            .map(|(m, _)| *m)
    }
}

/// Missing data never passes, whatever the threshold
pub fn metric_passes(actual: Option<f64>, threshold: f64) -> bool {
    matches!(actual, Some(pct) if pct >= threshold)
}

/// Validate coverage against the threshold
pub fn validate_threshold(report: &AggregateReport, config: &GateConfig) -> GateResult {
    let selection = select_metrics(report, config);

    let outcome = |actual: Option<f64>, gated: bool| MetricOutcome {
        actual,
        threshold: config.threshold,
        pass: metric_passes(actual, config.threshold),
        gated,
    };

    let mut per_metric = BTreeMap::new();
    for (metric, actual) in &selection.informational {
        per_metric.insert(*metric, outcome(*actual, false));
    }
    for (metric, actual) in &selection.gated {
        per_metric.insert(*metric, outcome(*actual, true));
    }

    let overall_pass = selection
        .gated
        .iter()
        .all(|(_, actual)| metric_passes(*actual, config.threshold));

    GateResult {
        per_metric,
        overall_pass,
    }
}
