//! Core data models for repos-health
//!
//! These models are shared by checkers, the scheduling engine, the
//! aggregator and every reporter.

use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Generate a deterministic finding ID based on content hash.
///
/// Stable across runs so findings can be diffed and suppressed by ID.
/// The ID is a 16-character hex string of the xxh3 hash of checker,
/// repository, file, line and message.
pub fn deterministic_finding_id(
    checker: &str,
    repository: &str,
    file: Option<&Path>,
    line: Option<u32>,
    message: &str,
) -> String {
    let file = file.map(|p| p.to_string_lossy()).unwrap_or_default();
    let line = line.map(|l| l.to_string()).unwrap_or_default();
    let input = format!("{checker}\n{repository}\n{file}\n{line}\n{message}");
    format!("{:016x}", xxhash_rust::xxh3::xxh3_64(input.as_bytes()))
}

/// Severity levels for findings
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(ConfigError::InvalidSeverity(s.to_string())),
        }
    }
}

/// A repository handed to the engine by the discovery layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Repository {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            tags: Vec::new(),
        }
    }

    /// Build a repository from a local path, naming it after the last component
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        let name = canonical
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("repository")
            .to_string();
        Self::new(name, path)
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Apply tag filters: include tags first (any match), then exclude tags.
pub fn filter_repositories(
    repos: &[Repository],
    include_tags: &[String],
    exclude_tags: &[String],
) -> Vec<Repository> {
    repos
        .iter()
        .filter(|r| include_tags.is_empty() || include_tags.iter().any(|t| r.has_tag(t)))
        .filter(|r| !exclude_tags.iter().any(|t| r.has_tag(t)))
        .cloned()
        .collect()
}

/// A measured value attached to a finding (e.g. complexity vs threshold)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u64>,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
            threshold: None,
        }
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

/// One reported issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub checker: String,
    pub category: String,
    pub severity: Severity,
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
}

impl Finding {
    pub fn new(
        checker: impl Into<String>,
        category: impl Into<String>,
        severity: Severity,
        repository: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut finding = Self {
            id: String::new(),
            checker: checker.into(),
            category: category.into(),
            severity,
            repository: repository.into(),
            file: None,
            line: None,
            message: message.into(),
            metric: None,
        };
        finding.refresh_id();
        finding
    }

    /// Attach a file location
    pub fn at(mut self, file: impl Into<PathBuf>, line: Option<u32>) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self.refresh_id();
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = Some(metric);
        self
    }

    /// `path:line` or just `path`, empty when the finding has no location
    pub fn location(&self) -> String {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => format!("{}:{}", file.display(), line),
            (Some(file), None) => file.display().to_string(),
            _ => String::new(),
        }
    }

    fn refresh_id(&mut self) {
        self.id = deterministic_finding_id(
            &self.checker,
            &self.repository,
            self.file.as_deref(),
            self.line,
            &self.message,
        );
    }
}

/// Counts of findings per severity level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
}

impl SeverityCounts {
    pub fn from_findings<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut counts = Self::default();
        for f in findings {
            counts.record(f.severity);
        }
        counts
    }

    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
        self.total += 1;
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }
}

/// Three-bucket summary used for the exit code contract.
///
/// `critical` counts critical findings, `warning` counts high and medium,
/// `info` counts low and info.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

impl Summary {
    pub fn from_counts(counts: &SeverityCounts) -> Self {
        Self {
            critical: counts.critical,
            warning: counts.high + counts.medium,
            info: counts.low + counts.info,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.warning + self.info
    }
}

/// Findings of one category, by severity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub counts: SeverityCounts,
}

/// Findings for one repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryReport {
    pub path: PathBuf,
    #[serde(default)]
    pub tags: Vec<String>,
    pub findings: Vec<Finding>,
}

impl RepositoryReport {
    pub fn counts(&self) -> SeverityCounts {
        SeverityCounts::from_findings(&self.findings)
    }
}

/// Run information that is not part of the findings themselves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub checkers: Vec<String>,
    pub tasks: usize,
    pub cache_hits: usize,
    #[serde(default)]
    pub cache_misses: usize,
    pub failed_tasks: usize,
}

impl Default for ReportMetadata {
    fn default() -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
            duration_ms: 0,
            checkers: Vec::new(),
            tasks: 0,
            cache_hits: 0,
            cache_misses: 0,
            failed_tasks: 0,
        }
    }
}

/// Aggregated result of one engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub repositories: BTreeMap<String, RepositoryReport>,
    pub summary: Summary,
    pub severity_counts: SeverityCounts,
    pub categories: Vec<CategorySummary>,
    pub metadata: ReportMetadata,
}

impl HealthReport {
    /// Process exit code: 2 with critical findings, 1 with warnings, else 0
    pub fn exit_code(&self) -> i32 {
        if self.summary.critical > 0 {
            2
        } else if self.summary.warning > 0 {
            1
        } else {
            0
        }
    }

    pub fn total_findings(&self) -> usize {
        self.repositories.values().map(|r| r.findings.len()).sum()
    }

    /// All findings in report order
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.repositories.values().flat_map(|r| r.findings.iter())
    }
}
