use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use covgate::config::{parse_metrics, parse_threshold, Config, Overrides, CONFIG_FILE};
use covgate::report::{render_json, render_summary, render_table};
use covgate::{Evaluation, Outcome, RunOptions, Runner, ShellExecutor, FATAL_EXIT_CODE};

#[derive(Parser)]
#[command(name = "covgate")]
#[command(about = "Run tests with coverage and gate the result against a threshold")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: covgate.toml, optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Minimum coverage percentage for every gated metric (default: 80)
    #[arg(short, long, global = true, env = "COVERAGE_MIN")]
    threshold: Option<String>,

    /// Comma-separated metrics to gate on (default: statements,lines)
    #[arg(short, long, global = true, value_delimiter = ',')]
    metrics: Option<Vec<String>>,

    /// Directory holding the coverage reports (default: coverage)
    #[arg(long, global = true)]
    coverage_dir: Option<PathBuf>,

    /// Print the result as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install dependencies, run the tests with coverage, then gate
    Run {
        /// Do not run the install commands
        #[arg(long)]
        skip_install: bool,
    },

    /// Gate the coverage reports already on disk
    Check,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(FATAL_EXIT_CODE);
        }
    }
}

fn run() -> Result<i32> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = parse_error_code(&e);
            e.print().context("Could not print usage")?;
            return Ok(code);
        }
    };

    let (config, base_dir) = load_config(cli.config.as_deref())?;
    let settings = config.resolve(&overrides(&cli)?)?;

    let options = match cli.command {
        Commands::Run { skip_install } => RunOptions {
            run_commands: true,
            skip_install,
        },
        Commands::Check => RunOptions::default(),
    };

    let run = Runner::new(&settings, &base_dir, ShellExecutor)
        .with_options(options)
        .run();

    let outcome = Outcome::from_run(&run);
    match run {
        Ok(evaluation) => print_evaluation(&evaluation, cli.json)?,
        Err(e) if outcome.is_some() => {
            eprintln!("\n{} {}", "✗".red().bold(), e);
        }
        Err(e) => {
            let stage = e.stage();
            return Err(anyhow::Error::new(e).context(format!("{} stage failed", stage)));
        }
    }

    Ok(outcome.map(|o| o.exit_code()).unwrap_or(FATAL_EXIT_CODE))
}

/// `--help` and `--version` succeed; every other usage error is fatal
fn parse_error_code(e: &clap::Error) -> i32 {
    if e.use_stderr() {
        FATAL_EXIT_CODE
    } else {
        0
    }
}

fn overrides(cli: &Cli) -> Result<Overrides> {
    let threshold = match cli.threshold {
        Some(ref raw) => parse_threshold(raw)?,
        None => None,
    };
    let metrics = cli.metrics.as_deref().map(parse_metrics).transpose()?;

    Ok(Overrides {
        threshold,
        metrics,
        coverage_dir: cli.coverage_dir.clone(),
    })
}

/// Config plus the directory commands and coverage paths are relative to
fn load_config(explicit: Option<&Path>) -> Result<(Config, PathBuf)> {
    let cwd = std::env::current_dir().context("Could not determine current directory")?;

    match explicit {
        Some(path) => {
            // Canonicalize config path to get absolute path, then get parent
            let path = std::fs::canonicalize(path)
                .with_context(|| format!("Could not find config file: {}", path.display()))?;
            let config = Config::load(&path)
                .with_context(|| format!("Could not load {}", path.display()))?;
            let base_dir = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
            Ok((config, base_dir))
        }
        None => {
            let config = Config::load_or_default(&cwd.join(CONFIG_FILE))?;
            Ok((config, cwd))
        }
    }
}

fn print_evaluation(evaluation: &Evaluation, json: bool) -> Result<()> {
    if json {
        println!("{}", render_json(Some(&evaluation.source), &evaluation.result)?);
        return Ok(());
    }

    println!(
        "\n{} Coverage loaded from: {}",
        "→".blue(),
        evaluation.source.display().to_string().dimmed()
    );
    println!("\n{}", render_table(&evaluation.result));

    let summary = render_summary(&evaluation.result);
    if evaluation.result.overall_pass {
        println!("{} {}", "✓".green().bold(), summary.green());
    } else {
        eprintln!("{} {}", "✗".red().bold(), summary.red());
    }

    Ok(())
}
