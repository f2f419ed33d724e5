//! Istanbul raw coverage (`coverage-final.json`) aggregation

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::{AggregateReport, CoverageTotals};
use crate::error::{GateError, Result};

/// Raw hit counts for one source file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileCoverageRecord {
    /// Statement id -> hits
    #[serde(default, deserialize_with = "null_as_empty")]
    pub s: BTreeMap<String, u64>,
    /// Branch id -> hits per arm
    #[serde(default, deserialize_with = "null_as_empty")]
    pub b: BTreeMap<String, Vec<u64>>,
    /// Function id -> hits
    #[serde(default, deserialize_with = "null_as_empty")]
    pub f: BTreeMap<String, u64>,
    /// Line number -> hits
    #[serde(default)]
    pub l: Option<BTreeMap<String, u64>>,
    /// Statement id -> source span, used to derive `l` when asked to
    #[serde(default, rename = "statementMap", deserialize_with = "null_as_empty")]
    pub statement_map: BTreeMap<String, Span>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub start: Position,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub line: Option<u32>,
}

/// `null` reads as an empty map, like a missing key
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// How raw records are folded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Build line entries from `statementMap` for files without `l`;
    /// off by default, where such files contribute no lines
    pub derive_lines: bool,
}

/// File identifier -> record, as written by the `json` reporter
pub type FinalCoverage = BTreeMap<String, FileCoverageRecord>;

impl FileCoverageRecord {
    /// Line hits derived from statement starts, the max over statements per line
    pub fn derived_line_hits(&self) -> BTreeMap<u32, u64> {
        let mut lines: BTreeMap<u32, u64> = BTreeMap::new();
        for (id, span) in &self.statement_map {
            let Some(line) = span.start.line else {
                continue;
            };
            let hits = self.s.get(id).copied().unwrap_or(0);
            let entry = lines.entry(line).or_insert(0);
            *entry = (*entry).max(hits);
        }
        lines
    }

    fn fold_into(&self, totals: &mut CoverageTotals, options: AggregateOptions) {
        for hits in self.s.values() {
            totals.statements.record(*hits);
        }

        // Every arm counts on its own: [5, 0] is 1 of 2
        for arms in self.b.values() {
            for hits in arms {
                totals.branches.record(*hits);
            }
        }

        for hits in self.f.values() {
            totals.functions.record(*hits);
        }

        match self.l {
            Some(ref lines) => {
                for hits in lines.values() {
                    totals.lines.record(*hits);
                }
            }
            None if options.derive_lines => {
                for hits in self.derived_line_hits().values() {
                    totals.lines.record(*hits);
                }
            }
            None => {}
        }
    }
}

/// Fold every file into one count per metric
pub fn aggregate(files: &FinalCoverage, options: AggregateOptions) -> CoverageTotals {
    let mut totals = CoverageTotals::default();
    for record in files.values() {
        record.fold_into(&mut totals, options);
    }

    log::debug!(
        "aggregated {} file(s): statements {}/{}, branches {}/{}, functions {}/{}, lines {}/{}",
        files.len(),
        totals.statements.covered(),
        totals.statements.total(),
        totals.branches.covered(),
        totals.branches.total(),
        totals.functions.covered(),
        totals.functions.total(),
        totals.lines.covered(),
        totals.lines.total(),
    );

    totals
}

/// Parse `coverage-final.json` content
pub fn parse_final_string(content: &str) -> serde_json::Result<FinalCoverage> {
    serde_json::from_str(content)
}

/// Load and aggregate raw coverage; `Ok(None)` when the file does not exist
pub fn load_final(path: &Path, options: AggregateOptions) -> Result<Option<AggregateReport>> {
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

    let files = parse_final_string(&content).map_err(|source| GateError::MalformedReport {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(AggregateReport::from_counts(&aggregate(&files, options))))
}

/// Like [`load_final`], but a missing file is `NoCoverageData`
pub fn aggregate_file(path: &Path, options: AggregateOptions) -> Result<AggregateReport> {
    load_final(path, options)?.ok_or_else(|| GateError::NoCoverageData {
        searched: vec![path.to_path_buf()],
    })
}
