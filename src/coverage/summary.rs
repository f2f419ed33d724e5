//! Istanbul `json-summary` loader (`coverage-summary.json`)

use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::{AggregateReport, Metric};
use crate::error::{GateError, Result};

/// Load a pre-aggregated summary; `Ok(None)` when the file does not exist
pub fn load_summary(path: &Path) -> Result<Option<AggregateReport>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(GateError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    parse_summary_string(&content)
        .map(Some)
        .map_err(|source| GateError::MalformedReport {
            path: path.to_path_buf(),
            source,
        })
}

/// Parse summary JSON, reading `total` or the document root
pub fn parse_summary_string(content: &str) -> serde_json::Result<AggregateReport> {
    let doc: Value = serde_json::from_str(content)?;
    let total = doc.get("total").unwrap_or(&doc);

    Ok(Metric::ALL.into_iter().fold(AggregateReport::empty(), |report, m| {
        // Istanbul writes "Unknown" for metrics it could not compute
        let pct = total
            .get(m.as_str())
            .and_then(|entry| entry.get("pct"))
            .and_then(Value::as_f64);
        report.with(m, pct)
    }))
}
