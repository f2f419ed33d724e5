use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::coverage::{
    default_sources, AggregateOptions, CoverageSource, GateConfig, Metric, DEFAULT_THRESHOLD,
};
use crate::execution::InstallCommands;

pub const CONFIG_FILE: &str = "covgate.toml";

/// Contents of `covgate.toml`; every key is optional
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gate: Gate,
    #[serde(default)]
    pub coverage: Coverage,
    #[serde(default)]
    pub commands: Commands,
}

#[derive(Debug, Default, Deserialize)]
pub struct Gate {
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Metrics that must reach the threshold (default: statements, lines)
    #[serde(default)]
    pub metrics: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct Coverage {
    /// Directory holding the reports; `$VAR` and `~` are expanded
    #[serde(default = "default_coverage_dir")]
    pub dir: String,
    #[serde(default = "default_summary_file")]
    pub summary: String,
    #[serde(default = "default_raw_file")]
    pub raw: String,
    /// Build line coverage from `statementMap` for raw files without `l`
    #[serde(default)]
    pub derive_lines: bool,
}

impl Default for Coverage {
    fn default() -> Self {
        Self {
            dir: default_coverage_dir(),
            summary: default_summary_file(),
            raw: default_raw_file(),
            derive_lines: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Commands {
    /// Empty string disables the install stage
    #[serde(default = "default_install")]
    pub install: String,
    /// Tried once when `install` fails; empty string disables it
    #[serde(default = "default_install_fallback")]
    pub install_fallback: String,
    #[serde(default = "default_test")]
    pub test: String,
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            install: default_install(),
            install_fallback: default_install_fallback(),
            test: default_test(),
        }
    }
}

fn default_coverage_dir() -> String {
    "coverage".to_string()
}

fn default_summary_file() -> String {
    "coverage-summary.json".to_string()
}

fn default_raw_file() -> String {
    "coverage-final.json".to_string()
}

fn default_install() -> String {
    "npm ci".to_string()
}

fn default_install_fallback() -> String {
    "npm install".to_string()
}

fn default_test() -> String {
    "npm run tests -- --coverageReporters=json-summary --coverageReporters=json \
     --coverageReporters=text-summary --coverageReporters=lcov"
        .to_string()
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub threshold: Option<f64>,
    pub metrics: Option<Vec<Metric>>,
    pub coverage_dir: Option<PathBuf>,
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub gate: GateConfig,
    pub coverage_dir: PathBuf,
    pub summary_file: String,
    pub raw_file: String,
    pub aggregate: AggregateOptions,
    pub install: Option<InstallCommands>,
    pub test_command: String,
}

impl Settings {
    /// Loader chain rooted at `base_dir`: summary first, then raw data
    pub fn sources(&self, base_dir: &Path) -> Vec<Box<dyn CoverageSource>> {
        default_sources(
            &base_dir.join(&self.coverage_dir),
            &self.summary_file,
            &self.raw_file,
            self.aggregate,
        )
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load `path` if it exists; a missing file means defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.gate.threshold {
            if !threshold.is_finite() {
                anyhow::bail!("gate.threshold must be a number, got {}", threshold);
            }
        }

        self.gated_metrics()?;

        if self.commands.test.trim().is_empty() {
            anyhow::bail!("commands.test must not be empty");
        }

        Ok(())
    }

    fn gated_metrics(&self) -> Result<Option<Vec<Metric>>> {
        self.gate
            .metrics
            .as_ref()
            .map(|names| {
                names
                    .iter()
                    .map(|name| name.parse::<Metric>().map_err(anyhow::Error::msg))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()
    }

    /// Merge with overrides: command line and environment win over the file
    pub fn resolve(&self, overrides: &Overrides) -> Result<Settings> {
        let threshold = overrides
            .threshold
            .or(self.gate.threshold)
            .unwrap_or(DEFAULT_THRESHOLD);
        if !threshold.is_finite() {
            anyhow::bail!("threshold must be a number, got {}", threshold);
        }

        let gate = match overrides.metrics.clone().or(self.gated_metrics()?) {
            Some(metrics) => GateConfig::new(threshold, metrics),
            None => GateConfig {
                threshold,
                ..GateConfig::default()
            },
        };

        let coverage_dir = match overrides.coverage_dir {
            Some(ref dir) => dir.clone(),
            None => expand_path(&self.coverage.dir)?,
        };

        let install = non_empty(&self.commands.install).map(|primary| InstallCommands {
            primary,
            fallback: non_empty(&self.commands.install_fallback),
        });

        let settings = Settings {
            gate,
            coverage_dir,
            summary_file: self.coverage.summary.clone(),
            raw_file: self.coverage.raw.clone(),
            aggregate: AggregateOptions {
                derive_lines: self.coverage.derive_lines,
            },
            install,
            test_command: self.commands.test.clone(),
        };

        log::debug!("resolved settings: {:?}", settings);

        Ok(settings)
    }
}

/// Threshold as given on the command line or in `COVERAGE_MIN`.
///
/// Surrounding whitespace is ignored and a blank value means unset.
pub fn parse_threshold(raw: &str) -> Result<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    match raw.parse::<f64>() {
        Ok(threshold) if threshold.is_finite() => Ok(Some(threshold)),
        _ => anyhow::bail!("threshold must be a number, got {:?}", raw),
    }
}

/// Metric names as given on the command line; blank entries are skipped
pub fn parse_metrics(names: &[String]) -> Result<Vec<Metric>> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| name.parse::<Metric>().map_err(anyhow::Error::msg))
        .collect()
}

fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .with_context(|| format!("Failed to expand coverage directory: {}", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

fn non_empty(cmd: &str) -> Option<String> {
    let cmd = cmd.trim();
    (!cmd.is_empty()).then(|| cmd.to_string())
}
