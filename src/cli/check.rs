//! `check` command: resolve repositories, run the engine, render reports

use super::{load_config, CheckArgs};
use crate::cache::default_cache_file;
use crate::checkers::CheckerRegistry;
use crate::config::HealthConfig;
use crate::engine::{EngineOptions, HealthEngine};
use crate::models::{filter_repositories, HealthReport, Repository, Severity};
use crate::reporters::{self, table, OutputFormat, ReporterOptions};
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Run a health check; returns the exit code derived from the report
pub fn run_check(args: &CheckArgs) -> Result<i32> {
    let config = load_config(args.config.as_deref())?;
    let registry = Arc::new(CheckerRegistry::from_config(&config)?);

    let mut settings = config.engine_settings()?;
    if args.no_cache {
        settings.cache_enabled = false;
    }
    // Persist between invocations unless the config names a file
    if settings.cache_enabled && settings.cache_file.is_none() {
        let cwd = std::env::current_dir().context("Cannot determine working directory")?;
        settings.cache_file = Some(default_cache_file(&cwd));
    }

    let repositories = resolve_repositories(args, &config)?;
    if repositories.is_empty() {
        warn!("No repositories left after tag filtering");
    }

    let format = args.format.unwrap_or(OutputFormat::Table);
    let options = EngineOptions {
        include_categories: args.categories.clone(),
        exclude_categories: args.exclude.clone(),
        severity_threshold: args
            .severity
            .as_deref()
            .map(str::parse::<Severity>)
            .transpose()?,
        output_format: format,
        output_file: args.output_file.clone(),
        parallel: !args.sequential,
        timeout_seconds: args.timeout,
    };

    let mut engine = HealthEngine::new(registry, settings);
    let bar = progress_bar();
    if let Some(bar) = &bar {
        let bar = bar.clone();
        engine = engine.on_progress(Arc::new(move |label: &str, done: usize, total: usize| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
            bar.set_message(label.to_string());
        }));
    }
    let report = engine.run(&repositories, &options)?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    write_primary(&report, args, &config, &options)?;
    write_configured(&report, &config, format);
    Ok(report.exit_code())
}

/// Positional paths win; otherwise configured repositories; otherwise "."
fn resolve_repositories(args: &CheckArgs, config: &HealthConfig) -> Result<Vec<Repository>> {
    let repositories = if !args.paths.is_empty() {
        let mut repos = Vec::with_capacity(args.paths.len());
        for path in &args.paths {
            if !path.is_dir() {
                bail!("Repository path {} is not a directory", path.display());
            }
            repos.push(Repository::from_path(path));
        }
        repos
    } else {
        let configured = config.repositories();
        if configured.is_empty() {
            vec![Repository::from_path(PathBuf::from("."))]
        } else {
            configured
        }
    };
    let filtered = filter_repositories(&repositories, &args.tag, &args.exclude_tag);
    info!(
        "Checking {} of {} repositories",
        filtered.len(),
        repositories.len()
    );
    Ok(filtered)
}

/// Progress bar on an interactive stderr only
fn progress_bar() -> Option<ProgressBar> {
    if !console::Term::stderr().is_term() {
        return None;
    }
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .ok()?
        .progress_chars("=>-");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(100));
    Some(bar)
}

fn reporter_options(config: &HealthConfig, format: OutputFormat, to_terminal: bool) -> Result<ReporterOptions> {
    let mut options = match config.reporters.get(format.as_str()) {
        Some(reporter) => ReporterOptions::from_config(format, reporter)?,
        None => ReporterOptions::default(),
    };
    let color_configured = config
        .reporters
        .get(format.as_str())
        .is_some_and(|r| r.options.contains_key("color_output"));
    if !color_configured {
        options.color_output = to_terminal;
    }
    Ok(options)
}

/// The report selected on the command line
fn write_primary(
    report: &HealthReport,
    args: &CheckArgs,
    config: &HealthConfig,
    options: &EngineOptions,
) -> Result<()> {
    let format = options.output_format;
    let output_file = options.output_file.clone().or_else(|| {
        config
            .reporters
            .get(format.as_str())
            .and_then(|r| r.output_file.clone())
    });
    let to_terminal = output_file.is_none() && super::stdout_is_term();
    let reporter_options = reporter_options(config, format, to_terminal)?;

    if args.summary {
        let summary = table::render_summary(report, reporter_options.color_output);
        match &output_file {
            Some(path) => std::fs::write(path, summary)
                .with_context(|| format!("Failed to write summary to {}", path.display()))?,
            None => print!("{summary}"),
        }
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    reporters::write_report(report, format, &reporter_options, output_file.as_deref(), &mut out)
        .with_context(|| format!("Failed to write {} report", format))
}

/// Additional reporters enabled in the configuration with an output file.
/// A failing reporter is logged and never affects the others.
fn write_configured(report: &HealthReport, config: &HealthConfig, primary: OutputFormat) {
    for (id, reporter) in &config.reporters {
        let Ok(format) = id.parse::<OutputFormat>() else {
            continue;
        };
        let Some(path) = reporter.output_file.as_deref() else {
            continue;
        };
        if format == primary || !reporter.enabled {
            continue;
        }
        let result = ReporterOptions::from_config(format, reporter)
            .map_err(anyhow::Error::from)
            .and_then(|options| {
                reporters::write_report(report, format, &options, Some(path), &mut std::io::sink())
                    .map_err(anyhow::Error::from)
            });
        if let Err(e) = result {
            error!("{} reporter failed: {:#}", format, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_win_over_configured_repositories() {
        let dir = tempfile::tempdir().unwrap();
        let config = HealthConfig::from_yaml_str("repositories:\n  - { name: other, path: /nonexistent }\n").unwrap();
        let args = CheckArgs {
            paths: vec![dir.path().to_path_buf()],
            ..CheckArgs::default()
        };
        let repos = resolve_repositories(&args, &config).unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].path, dir.path());
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let args = CheckArgs {
            paths: vec![PathBuf::from("/nonexistent/repos-health-test")],
            ..CheckArgs::default()
        };
        assert!(resolve_repositories(&args, &HealthConfig::default()).is_err());
    }

    #[test]
    fn test_tag_filters_apply_to_configured_repositories() {
        let config = HealthConfig::from_yaml_str(
            "repositories:\n  - { name: api, path: /srv/api, tags: [backend] }\n  - { name: site, path: /srv/site, tags: [frontend] }\n",
        )
        .unwrap();
        let args = CheckArgs {
            exclude_tag: vec!["frontend".into()],
            ..CheckArgs::default()
        };
        let repos = resolve_repositories(&args, &config).unwrap();
        let names: Vec<_> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["api"]);
    }

    #[test]
    fn test_configured_reporter_options() {
        let config = HealthConfig::from_yaml_str(
            "reporters:\n  table:\n    options: { max_issues_shown: 3, color_output: false }\n",
        )
        .unwrap();
        let options = reporter_options(&config, OutputFormat::Table, true).unwrap();
        assert_eq!(options.max_issues_shown, Some(3));
        assert!(!options.color_output);

        let options = reporter_options(&config, OutputFormat::Json, true).unwrap();
        assert!(options.color_output);
    }
}
