//! CLI command definitions and handlers

mod check;

use crate::checkers::CheckerRegistry;
use crate::config::HealthConfig;
use crate::reporters::{table, OutputFormat};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub use check::run_check;

/// Parse an output format name
fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse::<OutputFormat>().map_err(|e| e.to_string())
}

/// Parse a positive timeout in seconds
fn parse_timeout(s: &str) -> Result<u64, String> {
    let n: u64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number of seconds", s))?;
    if n == 0 {
        Err("timeout must be at least 1 second".to_string())
    } else {
        Ok(n)
    }
}

/// repos-health - health checks across many repositories
#[derive(Parser, Debug)]
#[command(name = "repos-health")]
#[command(
    version,
    about = "Run pluggable health checks across many repositories and report findings by severity",
    long_about = "repos-health runs checkers (complexity, git state, secrets, permissions, \
dependencies, documentation) over a set of local repositories in parallel, with \
per-checker timeouts, retries and a result cache, and reports findings by severity.\n\n\
Run without a subcommand to check the current directory:\n  \
repos-health .\n\n\
Exit codes: 0 clean, 1 warnings, 2 critical findings, 3 configuration or runtime error.",
    after_help = "\
Examples:
  repos-health .                                 Check the current directory
  repos-health ../api ../web --format json       JSON report for two repositories
  repos-health -c fleet.yaml --tag backend       Repositories from a config file, filtered by tag
  repos-health --categories security,git         Only security and git checkers
  repos-health --format html -o report.html      Standalone HTML report
  repos-health --summary                         Per-repository severity table
  repos-health categories                        List checker categories"
)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub check: CheckArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the enabled checkers and report findings (default)
    #[command(after_help = "\
Examples:
  repos-health check .                           Check the current directory
  repos-health check --severity high             Only high and critical findings
  repos-health check --exclude dependencies      Skip dependency checks
  repos-health check --timeout 30 --sequential   One task at a time, 30s per checker
  repos-health check --format flake8             path:line:col: CODE message lines")]
    Check(CheckArgs),

    /// List checker categories with their checkers
    Categories {
        /// Configuration file (default: discovered in the current directory)
        #[arg(long, short = 'c', env = "REPOS_HEALTH_CONFIG")]
        config: Option<PathBuf>,
    },

    /// List checker definitions after configuration is applied
    Checkers {
        /// Configuration file (default: discovered in the current directory)
        #[arg(long, short = 'c', env = "REPOS_HEALTH_CONFIG")]
        config: Option<PathBuf>,

        /// Print definitions as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Options for a check run
#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Repository paths (default: repositories from the config, else ".")
    pub paths: Vec<PathBuf>,

    /// Configuration file (default: discovered in the current directory)
    #[arg(long, short = 'c', env = "REPOS_HEALTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only repositories carrying any of these tags
    #[arg(long, value_delimiter = ',')]
    pub tag: Vec<String>,

    /// Skip repositories carrying any of these tags
    #[arg(long, value_delimiter = ',')]
    pub exclude_tag: Vec<String>,

    /// Only checkers in these categories
    #[arg(long, value_delimiter = ',')]
    pub categories: Vec<String>,

    /// Skip checkers in these categories
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Minimum severity to report (critical, high, medium, low, info)
    #[arg(long, value_parser = ["critical", "high", "medium", "low", "info"])]
    pub severity: Option<String>,

    /// Output format: table, json, yaml, xml, html, csv, flake8
    #[arg(long, short = 'f', value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output_file: Option<PathBuf>,

    /// Per-checker timeout in seconds (overrides configuration)
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<u64>,

    /// Run one task at a time
    #[arg(long)]
    pub sequential: bool,

    /// Disable the result cache for this run
    #[arg(long)]
    pub no_cache: bool,

    /// Print only the per-repository severity table
    #[arg(long)]
    pub summary: bool,
}

/// Explicit config file, or one discovered in the working directory
fn load_config(path: Option<&Path>) -> Result<HealthConfig> {
    match path {
        Some(path) => HealthConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("Cannot determine working directory")?;
            HealthConfig::discover(&cwd).context("Failed to load configuration")
        }
    }
}

/// Dispatch a parsed command line; returns the process exit code
pub fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Some(Commands::Check(args)) => run_check(&args),
        Some(Commands::Categories { config }) => {
            let config = load_config(config.as_deref())?;
            let registry = CheckerRegistry::from_config(&config)?;
            print!("{}", table::render_categories(&registry, stdout_is_term()));
            Ok(0)
        }
        Some(Commands::Checkers { config, json }) => {
            let config = load_config(config.as_deref())?;
            let registry = CheckerRegistry::from_config(&config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(registry.definitions())?);
            } else {
                print!("{}", table::render_checkers(&registry, stdout_is_term()));
            }
            Ok(0)
        }
        None => run_check(&cli.check),
    }
}

fn stdout_is_term() -> bool {
    console::Term::stdout().is_term() && console::colors_enabled()
}
