//! Output reporters for repos-health results
//!
//! Supports multiple output formats:
//! - `table` - Terminal output with colors
//! - `json` - Machine-readable JSON
//! - `yaml` - YAML document
//! - `xml` - XML document
//! - `html` - Standalone HTML report, optionally from a template
//! - `csv` - One row per finding
//! - `flake8` - `path:line:col: CODE message` lines for editor integration
//!
//! Reporters never mutate the report; rendering and write failures are
//! returned as [`ReportingError`]s.

mod csv;
mod flake8;
mod html;
mod json;
pub mod table;
mod xml;
mod yaml;

use crate::config::ReporterConfig;
use crate::error::{ConfigError, ReportingError};
use crate::models::HealthReport;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
    Xml,
    Html,
    Csv,
    Flake8,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Table,
        OutputFormat::Json,
        OutputFormat::Yaml,
        OutputFormat::Xml,
        OutputFormat::Html,
        OutputFormat::Csv,
        OutputFormat::Flake8,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Xml => "xml",
            OutputFormat::Html => "html",
            OutputFormat::Csv => "csv",
            OutputFormat::Flake8 => "flake8",
        }
    }

    /// Recommended file extension
    pub fn file_extension(&self) -> &'static str {
        match self {
            OutputFormat::Table | OutputFormat::Flake8 => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Xml => "xml",
            OutputFormat::Html => "html",
            OutputFormat::Csv => "csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ReportingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" | "text" | "terminal" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "xml" => Ok(OutputFormat::Xml),
            "html" => Ok(OutputFormat::Html),
            "csv" => Ok(OutputFormat::Csv),
            "flake8" => Ok(OutputFormat::Flake8),
            _ => Err(ReportingError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendering settings; each format reads the ones it recognizes
#[derive(Debug, Clone, PartialEq)]
pub struct ReporterOptions {
    /// table: print the summary block
    pub show_summary: bool,
    /// table: print individual findings
    pub show_details: bool,
    /// table: ANSI colors
    pub color_output: bool,
    /// table: findings shown per repository
    pub max_issues_shown: Option<usize>,
    /// json: indent output
    pub pretty_print: bool,
    /// json, yaml: include run metadata
    pub include_metadata: bool,
    /// xml: add generation timestamp and run duration
    pub include_timestamps: bool,
    /// html: page title
    pub title: String,
    /// html: template with `{{title}}`, `{{summary}}`, `{{content}}`
    pub template: Option<PathBuf>,
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            show_summary: true,
            show_details: true,
            color_output: false,
            max_issues_shown: None,
            pretty_print: true,
            include_metadata: true,
            include_timestamps: true,
            title: "Repository Health Report".to_string(),
            template: None,
        }
    }
}

fn typed_option<T: serde::de::DeserializeOwned>(
    reporter: &str,
    options: &BTreeMap<String, serde_json::Value>,
    key: &str,
    expected: &str,
) -> Result<Option<T>, ConfigError> {
    match options.get(key) {
        None => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|_| ConfigError::InvalidOption {
                checker: format!("reporters.{}", reporter),
                option: key.to_string(),
                expected: expected.to_string(),
            }),
    }
}

impl ReporterOptions {
    /// Options from a `reporters.<format>` configuration block
    pub fn from_config(format: OutputFormat, config: &ReporterConfig) -> Result<Self, ConfigError> {
        let id = format.as_str();
        let o = &config.options;
        let defaults = Self::default();
        Ok(Self {
            show_summary: typed_option(id, o, "show_summary", "a boolean")?
                .unwrap_or(defaults.show_summary),
            show_details: typed_option(id, o, "show_details", "a boolean")?
                .unwrap_or(defaults.show_details),
            color_output: typed_option(id, o, "color_output", "a boolean")?
                .unwrap_or(defaults.color_output),
            max_issues_shown: typed_option(id, o, "max_issues_shown", "an unsigned integer")?,
            pretty_print: typed_option(id, o, "pretty_print", "a boolean")?
                .unwrap_or(defaults.pretty_print),
            include_metadata: typed_option(id, o, "include_metadata", "a boolean")?
                .unwrap_or(defaults.include_metadata),
            include_timestamps: typed_option(id, o, "include_timestamps", "a boolean")?
                .unwrap_or(defaults.include_timestamps),
            title: typed_option(id, o, "title", "a string")?.unwrap_or(defaults.title),
            template: config.template.clone(),
        })
    }
}

/// A report renderer for one output format
pub trait Reporter: Send + Sync {
    fn format(&self) -> OutputFormat;

    fn render(&self, report: &HealthReport, options: &ReporterOptions)
        -> Result<String, ReportingError>;
}

/// Reporter implementation for a format
pub fn reporter_for(format: OutputFormat) -> Box<dyn Reporter> {
    match format {
        OutputFormat::Table => Box::new(table::TableReporter),
        OutputFormat::Json => Box::new(json::JsonReporter),
        OutputFormat::Yaml => Box::new(yaml::YamlReporter),
        OutputFormat::Xml => Box::new(xml::XmlReporter),
        OutputFormat::Html => Box::new(html::HtmlReporter),
        OutputFormat::Csv => Box::new(csv::CsvReporter),
        OutputFormat::Flake8 => Box::new(flake8::Flake8Reporter),
    }
}

/// Render a report in the given format
pub fn render(
    report: &HealthReport,
    format: OutputFormat,
    options: &ReporterOptions,
) -> Result<String, ReportingError> {
    reporter_for(format).render(report, options)
}

/// Render and write to `output_file`, or to `out` when none is given
pub fn write_report(
    report: &HealthReport,
    format: OutputFormat,
    options: &ReporterOptions,
    output_file: Option<&Path>,
    out: &mut dyn Write,
) -> Result<(), ReportingError> {
    let rendered = render(report, format, options)?;
    match output_file {
        Some(path) => {
            let io_err = |source: std::io::Error| ReportingError::Io {
                path: path.to_path_buf(),
                source,
            };
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
            std::fs::write(path, rendered.as_bytes()).map_err(io_err)?;
            info!("Wrote {} report to {}", format, path.display());
        }
        None => {
            out.write_all(rendered.as_bytes())?;
            if !rendered.ends_with('\n') {
                out.write_all(b"\n")?;
            }
            out.flush()?;
        }
    }
    Ok(())
}

/// Shared helpers for reporter tests
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::engine::{TaskOutcome, TaskState};
    use crate::models::{Finding, Metric, Repository, Severity};
    use std::time::Duration;

    /// Two repositories: one with findings, one clean
    pub(crate) fn test_report() -> HealthReport {
        let findings = vec![
            Finding::new(
                "cyclomatic-complexity",
                "quality",
                Severity::Medium,
                "api",
                "Function 'route' has cyclomatic complexity 14 (threshold 10)",
            )
            .at("src/router.rs", Some(42))
            .with_metric(Metric::new("cyclomatic_complexity", 14).with_threshold(10)),
            Finding::new(
                "secret-scan",
                "security",
                Severity::Critical,
                "api",
                "Possible AWS access key, \"quoted\" & <escaped>",
            )
            .at("config/settings.py", Some(7)),
            Finding::new("license-file", "documentation", Severity::Low, "api", "No LICENSE file"),
        ];
        let outcomes = vec![TaskOutcome {
            repository: "api".into(),
            checker: "mixed".into(),
            state: TaskState::Succeeded,
            findings,
            attempts: 1,
            cache_miss: false,
            error: None,
            duration: Duration::from_millis(5),
        }];
        let repos = vec![
            Repository::new("api", "/srv/api").with_tags(["backend"]),
            Repository::new("docs", "/srv/docs"),
        ];
        aggregate(&outcomes, &repos, None)
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from_str("table").unwrap(), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("yml").unwrap(), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_str("flake8").unwrap(), OutputFormat::Flake8);
        assert!(matches!(
            OutputFormat::from_str("pdf"),
            Err(ReportingError::UnsupportedFormat(_))
        ));
        for format in OutputFormat::ALL {
            assert_eq!(format.as_str().parse::<OutputFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_options_from_config() {
        let mut config = ReporterConfig::default();
        config.options.insert("max_issues_shown".into(), serde_json::json!(5));
        config.options.insert("pretty_print".into(), serde_json::json!(false));
        let options = ReporterOptions::from_config(OutputFormat::Table, &config).unwrap();
        assert_eq!(options.max_issues_shown, Some(5));
        assert!(!options.pretty_print);
        assert!(options.show_summary);

        config.options.insert("show_details".into(), serde_json::json!("yes"));
        assert!(matches!(
            ReporterOptions::from_config(OutputFormat::Table, &config),
            Err(ConfigError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_every_format_renders() {
        let report = test_report();
        for format in OutputFormat::ALL {
            let out = render(&report, format, &ReporterOptions::default()).unwrap();
            assert!(!out.is_empty(), "{format} rendered nothing");
        }
    }

    #[test]
    fn test_write_report_to_file_and_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.json");
        let report = test_report();
        let mut sink = Vec::new();
        write_report(&report, OutputFormat::Json, &ReporterOptions::default(), Some(&path), &mut sink)
            .unwrap();
        assert!(sink.is_empty());
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["summary"]["critical"], 1);

        write_report(&report, OutputFormat::Csv, &ReporterOptions::default(), None, &mut sink)
            .unwrap();
        assert!(String::from_utf8(sink).unwrap().starts_with("repository,"));
    }

    #[test]
    fn test_unwritable_output_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let result = write_report(
            &test_report(),
            OutputFormat::Json,
            &ReporterOptions::default(),
            Some(&blocker.join("report.json")),
            &mut Vec::new(),
        );
        assert!(matches!(result, Err(ReportingError::Io { .. })));
    }
}
