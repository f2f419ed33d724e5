//! The gate pipeline: install, test, load coverage, evaluate

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::coverage::{load_first, validate_threshold, AggregateReport, GateResult};
use crate::error::{GateError, Result};
use crate::execution::install::install_dependencies;
use crate::task::CommandExecutor;

/// Options for a pipeline run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Run the install and test commands before gating
    pub run_commands: bool,
    /// Skip the install stage even when commands run
    pub skip_install: bool,
}

/// Everything produced by a successful run
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Artifact the coverage was loaded from
    pub source: PathBuf,
    pub report: AggregateReport,
    pub result: GateResult,
}

pub struct Runner<'a, E: CommandExecutor> {
    settings: &'a Settings,
    base_dir: &'a Path,
    executor: E,
    options: RunOptions,
}

impl<'a, E: CommandExecutor> Runner<'a, E> {
    pub fn new(settings: &'a Settings, base_dir: &'a Path, executor: E) -> Self {
        Self {
            settings,
            base_dir,
            executor,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn run(&self) -> Result<Evaluation> {
        if self.options.run_commands {
            self.run_commands()?;
        }

        let loaded = load_first(&self.settings.sources(self.base_dir))?;
        log::debug!("coverage loaded from {}", loaded.source.display());

        let result = validate_threshold(&loaded.report, &self.settings.gate);

        Ok(Evaluation {
            source: loaded.source,
            report: loaded.report,
            result,
        })
    }

    /// A failed test run stops here, before stale artifacts can be read
    fn run_commands(&self) -> Result<()> {
        if self.options.skip_install {
            log::debug!("install stage skipped");
        } else if let Some(ref install) = self.settings.install {
            install_dependencies(&self.executor, install, self.base_dir)?;
        }

        let test = self
            .executor
            .execute(&self.settings.test_command, self.base_dir)?;

        if !test.success {
            return Err(GateError::TestRunFailed {
                command: test.command,
                code: test.code,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Overrides};
    use crate::coverage::Metric;
    use crate::outcome::Outcome;
    use crate::task::TaskResult;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    /// Fake toolchain: the test command writes the given artifacts
    struct FakeToolchain {
        test_succeeds: bool,
        artifacts: Vec<(&'static str, String)>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeToolchain {
        fn new(test_succeeds: bool) -> Self {
            Self {
                test_succeeds,
                artifacts: Vec::new(),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn writes(mut self, name: &'static str, content: impl Into<String>) -> Self {
            self.artifacts.push((name, content.into()));
            self
        }
    }

    impl CommandExecutor for FakeToolchain {
        fn execute(&self, cmd: &str, cwd: &Path) -> Result<TaskResult> {
            self.calls.borrow_mut().push(cmd.to_string());
            let is_test = cmd.starts_with("npm run tests");
            if is_test {
                let dir = cwd.join("coverage");
                fs::create_dir_all(&dir).unwrap();
                for (name, content) in &self.artifacts {
                    fs::write(dir.join(name), content).unwrap();
                }
            }
            let success = !is_test || self.test_succeeds;
            Ok(TaskResult {
                command: cmd.to_string(),
                success,
                code: Some(if success { 0 } else { 1 }),
                duration_ms: 0,
            })
        }
    }

    fn settings(threshold: f64, metrics: &[Metric]) -> Settings {
        let overrides = Overrides {
            threshold: Some(threshold),
            metrics: Some(metrics.to_vec()),
            coverage_dir: None,
        };
        Config::default().resolve(&overrides).unwrap()
    }

    fn final_json(statements: (usize, usize), lines: (usize, usize)) -> String {
        let hits = |(covered, total): (usize, usize)| -> String {
            (0..total)
                .map(|i| format!("\"{}\": {}", i + 1, if i < covered { 1 } else { 0 }))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            r#"{{"src/server.js": {{"s": {{{}}}, "l": {{{}}}, "b": {{}}, "f": {{}}}}}}"#,
            hits(statements),
            hits(lines)
        )
    }

    fn outcome(run: &Result<Evaluation>) -> Option<Outcome> {
        Outcome::from_run(run)
    }

    #[test]
    fn test_scenario_summary_passes() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings(80.0, &[Metric::Statements, Metric::Lines]);
        let toolchain = FakeToolchain::new(true).writes(
            "coverage-summary.json",
            r#"{"total": {"statements": {"pct": 85}, "lines": {"pct": 82}}}"#,
        );

        let run = Runner::new(&settings, temp_dir.path(), &toolchain)
            .with_options(RunOptions {
                run_commands: true,
                skip_install: false,
            })
            .run();

        assert_eq!(outcome(&run), Some(Outcome::GatePassed));
        assert_eq!(outcome(&run).unwrap().exit_code(), 0);
        assert_eq!(toolchain.calls.borrow().len(), 2);
        assert_eq!(toolchain.calls.borrow()[0], "npm ci");
    }

    #[test]
    fn test_scenario_raw_fallback_fails_gate() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings(80.0, &[Metric::Statements, Metric::Lines]);
        let toolchain = FakeToolchain::new(true)
            .writes("coverage-final.json", final_json((90, 100), (70, 100)));

        let run = Runner::new(&settings, temp_dir.path(), &toolchain)
            .with_options(RunOptions {
                run_commands: true,
                skip_install: true,
            })
            .run();

        let evaluation = run.as_ref().unwrap();
        assert!(evaluation.source.ends_with("coverage-final.json"));
        assert!(evaluation.result.per_metric[&Metric::Statements].pass);
        assert!(!evaluation.result.per_metric[&Metric::Lines].pass);
        assert_eq!(outcome(&run), Some(Outcome::GateFailed));
        assert_eq!(outcome(&run).unwrap().exit_code(), 1);
        assert_eq!(*toolchain.calls.borrow(), vec![settings.test_command.clone()]);
    }

    #[test]
    fn test_scenario_no_data() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings(80.0, &[Metric::Statements, Metric::Lines]);
        let toolchain = FakeToolchain::new(true);

        let run = Runner::new(&settings, temp_dir.path(), &toolchain).run();

        assert!(matches!(run, Err(GateError::NoCoverageData { .. })));
        assert_eq!(outcome(&run), Some(Outcome::DataUnavailable));
        assert_eq!(outcome(&run).unwrap().exit_code(), 2);
        assert!(toolchain.calls.borrow().is_empty());
    }

    #[test]
    fn test_scenario_malformed_summary() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings(80.0, &[Metric::Statements, Metric::Lines]);
        let toolchain = FakeToolchain::new(true)
            .writes("coverage-summary.json", "Statements : 85% ( 170/200 )");

        let run = Runner::new(&settings, temp_dir.path(), &toolchain)
            .with_options(RunOptions {
                run_commands: true,
                skip_install: true,
            })
            .run();

        assert!(matches!(run, Err(GateError::MalformedReport { .. })));
        assert_eq!(outcome(&run), None);
    }

    #[test]
    fn test_failed_test_run_never_reads_stale_coverage() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("coverage");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("coverage-summary.json"),
            r#"{"total": {"statements": {"pct": 100}, "lines": {"pct": 100}}}"#,
        )
        .unwrap();

        let settings = settings(80.0, &[Metric::Statements, Metric::Lines]);
        let toolchain = FakeToolchain::new(false);

        let run = Runner::new(&settings, temp_dir.path(), &toolchain)
            .with_options(RunOptions {
                run_commands: true,
                skip_install: false,
            })
            .run();

        match run {
            Err(GateError::TestRunFailed { code, .. }) => assert_eq!(code, Some(1)),
            other => panic!("expected TestRunFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_four_metric_gate_on_raw_data() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("coverage");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("coverage-final.json"),
            r#"{"a.js": {"s": {"0": 1}, "b": {"0": [5, 0]}, "f": {"0": 1}, "l": {"1": 1}}}"#,
        )
        .unwrap();

        let settings = settings(80.0, &Metric::ALL);
        let run = Runner::new(&settings, temp_dir.path(), &FakeToolchain::new(true)).run();

        let evaluation = run.as_ref().unwrap();
        assert_eq!(evaluation.report.get(Metric::Branches), Some(50.0));
        let failed: Vec<_> = evaluation.result.failed_metrics().map(|(m, _)| m).collect();
        assert_eq!(failed, vec![Metric::Branches]);
    }
}
