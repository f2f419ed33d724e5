//! Console and JSON rendering of a gate result
//!
//! Everything here returns strings; printing happens in `main`.

use serde::Serialize;
use std::path::Path;

use crate::coverage::{GateResult, Metric, MetricOutcome};

const HEADERS: [&str; 4] = ["Metric", "Actual (%)", "Limit (%)", "Status"];
const WIDTHS: [usize; 4] = [12, 12, 12, 8];
const MISSING: &str = "n/a";

/// Fixed-width table with one row per metric in the report
pub fn render_table(result: &GateResult) -> String {
    let gated: Vec<&str> = result.gated_metrics().map(|m| m.label()).collect();
    let title = if gated.is_empty() {
        "Coverage (no gated metrics):".to_string()
    } else {
        format!("Coverage (gated: {}):", gated.join(", "))
    };

    let mut out = format!("{}\n\n{}\n", title, row(HEADERS));
    for (metric, outcome) in &result.per_metric {
        let actual = format_pct(outcome.actual);
        let threshold = format_number(outcome.threshold);
        let status = status_cell(outcome);
        out.push_str(&row([metric.label(), &actual, &threshold, &status]));
        out.push('\n');
    }
    out
}

/// One-line verdict naming each failing gated metric and its shortfall
pub fn render_summary(result: &GateResult) -> String {
    let threshold = result
        .per_metric
        .values()
        .map(|o| o.threshold)
        .next()
        .map(format_number)
        .unwrap_or_else(|| MISSING.to_string());

    if result.overall_pass {
        let gated: Vec<&str> = result.gated_metrics().map(|m| m.label()).collect();
        if gated.is_empty() {
            return "Gate passed: no metrics gated.".to_string();
        }
        return format!("Gate passed: {} >= {}%.", gated.join(", "), threshold);
    }

    let failures: Vec<String> = result
        .failed_metrics()
        .map(|(metric, outcome)| describe_failure(metric, outcome))
        .collect();

    format!("Gate failed (limit {}%): {}.", threshold, failures.join(", "))
}

fn describe_failure(metric: Metric, outcome: &MetricOutcome) -> String {
    match (outcome.actual, outcome.delta()) {
        (Some(actual), Some(delta)) => format!(
            "{} {}% ({} pts)",
            metric.label(),
            format_number(actual),
            format_number(delta)
        ),
        _ => format!("{} {}", metric.label(), MISSING),
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    source: Option<&'a Path>,
    #[serde(flatten)]
    result: &'a GateResult,
}

/// Machine-readable form of the result
pub fn render_json(source: Option<&Path>, result: &GateResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport { source, result })
}

fn status_cell(outcome: &MetricOutcome) -> String {
    let verdict = if outcome.pass { "OK" } else { "FAIL" };
    if outcome.gated {
        verdict.to_string()
    } else {
        format!("{} (info)", verdict)
    }
}

fn row(cells: [&str; 4]) -> String {
    cells
        .iter()
        .zip(WIDTHS)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end()
        .to_string()
}

fn format_pct(pct: Option<f64>) -> String {
    pct.map(format_number).unwrap_or_else(|| MISSING.to_string())
}

/// `85` rather than `85.0`, `82.35` as is
fn format_number(value: f64) -> String {
    format!("{}", value)
}
