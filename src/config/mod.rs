//! Configuration for repos-health
//!
//! One document describes the repositories, engine policy, checker and
//! analyzer overrides and reporter settings. YAML is the default format;
//! `.toml` and `.json` files are accepted by extension.
//!
//! # Configuration Format
//!
//! ```yaml
//! repositories:
//!   - { name: api, path: ../api, tags: [backend] }
//!
//! engine:
//!   max_concurrency: 8
//!   timeout: 30s
//!   cache_ttl: 1h
//!   retry_attempts: 2
//!   retry_delay: 500ms
//!
//! checkers:
//!   cyclomatic-complexity:
//!     severity: high
//!     options:
//!       thresholds: { python: 12 }
//!   git-last-commit:
//!     enabled: false
//!
//! analyzers:
//!   go: { complexity_threshold: 15 }
//!
//! reporters:
//!   html: { output_file: health.html }
//! ```
//!
//! Complexity thresholds resolve with this precedence (highest first):
//! `checkers.cyclomatic-complexity.options`, the flat
//! `cyclomatic_complexity` block, `analyzers.<lang>.complexity_threshold`,
//! built-in defaults.

use crate::checkers::complexity::CHECKER_ID as COMPLEXITY_CHECKER_ID;
use crate::checkers::{CheckerDefinition, CheckerOptions, CheckerRegistry};
use crate::complexity::{default_analyzers, AnalyzerDefinition};
use crate::engine::EngineSettings;
use crate::error::ConfigError;
use crate::models::{Repository, Severity};
use crate::reporters::OutputFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File names searched, in order, when no configuration path is given
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "repos-health.yaml",
    "repos-health.yml",
    "repos-health.toml",
    "repos-health.json",
    ".repos-health.yaml",
    ".repos-health.yml",
];

/// The whole configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub repositories: Vec<RepositoryEntry>,
    pub engine: EngineConfig,
    pub checkers: BTreeMap<String, CheckerOverride>,
    pub analyzers: BTreeMap<String, AnalyzerOverride>,
    /// Legacy flat complexity block
    pub cyclomatic_complexity: Option<FlatComplexityConfig>,
    pub reporters: BTreeMap<String, ReporterConfig>,

    /// Directory the document was loaded from; relative repository paths
    /// resolve against it
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// A repository listed in the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    /// Defaults to the last path component
    #[serde(default)]
    pub name: Option<String>,
    pub path: PathBuf,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A duration as integer seconds, fractional seconds, or `500ms`/`30s`/`5m`/`1h`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationSpec {
    Seconds(u64),
    Fractional(f64),
    Text(String),
}

impl DurationSpec {
    pub fn to_duration(&self) -> Result<Duration, ConfigError> {
        match self {
            DurationSpec::Seconds(s) => Ok(Duration::from_secs(*s)),
            DurationSpec::Fractional(f) => Duration::try_from_secs_f64(*f)
                .map_err(|_| ConfigError::InvalidDuration(f.to_string())),
            DurationSpec::Text(text) => parse_duration(text),
        }
    }
}

impl From<Duration> for DurationSpec {
    fn from(d: Duration) -> Self {
        if d.subsec_nanos() == 0 {
            DurationSpec::Seconds(d.as_secs())
        } else {
            DurationSpec::Text(format!("{}ms", d.as_millis()))
        }
    }
}

/// Parse `500ms`, `30s`, `5m`, `1h` or a bare number of seconds
pub fn parse_duration(text: &str) -> Result<Duration, ConfigError> {
    let trimmed = text.trim();
    let invalid = || ConfigError::InvalidDuration(text.to_string());
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let value: f64 = number.parse().map_err(|_| invalid())?;
    let seconds = match unit.trim() {
        "" | "s" | "sec" | "secs" => value,
        "ms" => value / 1000.0,
        "m" | "min" | "mins" => value * 60.0,
        "h" | "hr" | "hrs" => value * 3600.0,
        _ => return Err(invalid()),
    };
    Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
}

/// Engine-level policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_concurrency: Option<usize>,
    pub timeout: DurationSpec,
    pub cache_enabled: bool,
    pub cache_ttl: DurationSpec,
    pub retry_attempts: u32,
    pub retry_delay: DurationSpec,
    /// Persist cache entries between runs
    pub cache_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            timeout: DurationSpec::Seconds(60),
            cache_enabled: true,
            cache_ttl: DurationSpec::Seconds(3600),
            retry_attempts: 2,
            retry_delay: DurationSpec::Seconds(1),
            cache_file: None,
        }
    }
}

/// Per-checker overrides; unset fields keep the checker's defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerOverride {
    pub enabled: Option<bool>,
    pub severity: Option<String>,
    pub timeout: Option<DurationSpec>,
    /// Merged key by key over the default options
    pub options: CheckerOptions,
    /// Replaces the default categories when set
    pub categories: Option<Vec<String>>,
    /// Replaces the default exclusion globs when set
    pub exclusions: Option<Vec<String>>,
}

impl CheckerOverride {
    pub fn apply(&self, definition: &mut CheckerDefinition) -> Result<(), ConfigError> {
        if let Some(enabled) = self.enabled {
            definition.enabled = enabled;
        }
        if let Some(severity) = &self.severity {
            definition.severity = severity.parse::<Severity>()?;
        }
        if let Some(timeout) = &self.timeout {
            definition.timeout = timeout.to_duration()?;
        }
        definition.options.merge(&self.options);
        if let Some(categories) = &self.categories {
            definition.categories = categories.clone();
        }
        if let Some(exclusions) = &self.exclusions {
            definition.exclusions = exclusions.clone();
        }
        Ok(())
    }
}

/// Per-language analyzer overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOverride {
    pub enabled: Option<bool>,
    pub file_extensions: Option<Vec<String>>,
    pub exclude_patterns: Option<Vec<String>>,
    pub complexity_threshold: Option<u32>,
    pub function_level: Option<bool>,
}

impl AnalyzerOverride {
    fn apply(&self, definition: &mut AnalyzerDefinition) {
        if let Some(enabled) = self.enabled {
            definition.enabled = enabled;
        }
        if let Some(extensions) = &self.file_extensions {
            definition.file_extensions = extensions.clone();
        }
        if let Some(patterns) = &self.exclude_patterns {
            definition.exclude_patterns = patterns.clone();
        }
        if let Some(threshold) = self.complexity_threshold {
            definition.complexity_threshold = threshold;
        }
        if let Some(function_level) = self.function_level {
            definition.function_level = function_level;
        }
    }
}

/// Flat `cyclomatic_complexity` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatComplexityConfig {
    pub detailed_report: Option<bool>,
    pub thresholds: BTreeMap<String, u32>,
}

/// Settings for one output format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub enabled: bool,
    pub output_file: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub options: BTreeMap<String, serde_json::Value>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_file: None,
            template: None,
            options: BTreeMap::new(),
        }
    }
}

impl HealthConfig {
    /// Load and validate a configuration file, choosing the format by extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let parsed = match ext.as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        let mut config = parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Look for a configuration file in `dir`; defaults when none exists
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Self::load(&candidate);
            }
        }
        debug!("No configuration file in {}, using defaults", dir.display());
        Ok(Self::default())
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, String> {
        let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value).map_err(|e| e.to_string())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn from_json_str(content: &str) -> Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    /// Reject anything that would only fail once checkers are running
    pub fn validate(&self) -> Result<(), ConfigError> {
        for id in self.reporters.keys() {
            if id.parse::<OutputFormat>().is_err() {
                return Err(ConfigError::UnknownReporter(id.clone()));
            }
        }
        CheckerRegistry::from_config(self)?;
        Ok(())
    }

    /// Configured repositories with relative paths resolved
    pub fn repositories(&self) -> Vec<Repository> {
        self.repositories
            .iter()
            .map(|entry| {
                let path = match &self.base_dir {
                    Some(base) if entry.path.is_relative() => base.join(&entry.path),
                    _ => entry.path.clone(),
                };
                let repository = match &entry.name {
                    Some(name) => Repository::new(name.clone(), path),
                    None => Repository::from_path(path),
                };
                repository.with_tags(entry.tags.clone())
            })
            .collect()
    }

    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        let engine = &self.engine;
        let max_concurrency = engine
            .max_concurrency
            .filter(|n| *n > 0)
            .unwrap_or_else(default_concurrency);
        let cache_file = match (&self.base_dir, &engine.cache_file) {
            (Some(base), Some(file)) if file.is_relative() => Some(base.join(file)),
            (_, file) => file.clone(),
        };
        Ok(EngineSettings {
            max_concurrency,
            timeout: engine.timeout.to_duration()?,
            cache_enabled: engine.cache_enabled,
            cache_ttl: engine.cache_ttl.to_duration()?,
            retry_attempts: engine.retry_attempts,
            retry_delay: engine.retry_delay.to_duration()?,
            cache_file,
        })
    }

    /// Built-in analyzers with `analyzers.<lang>` overrides applied
    pub fn analyzer_definitions(&self) -> Result<Vec<AnalyzerDefinition>, ConfigError> {
        let mut definitions = default_analyzers();
        for (language, overrides) in &self.analyzers {
            let key = language.to_ascii_lowercase();
            let definition = definitions
                .iter_mut()
                .find(|d| d.language == key)
                .ok_or_else(|| ConfigError::UnknownAnalyzer(language.clone()))?;
            overrides.apply(definition);
        }
        Ok(definitions)
    }

    fn checker_override(&self, id: &str) -> Option<&CheckerOverride> {
        self.checkers
            .iter()
            .find(|(raw, _)| normalize_checker_id(raw) == id)
            .map(|(_, o)| o)
    }

    /// Final option bag of the complexity checker.
    ///
    /// Starts from the checker's defaults, overlays the flat
    /// `cyclomatic_complexity` block, then the checker block's own options.
    /// `thresholds` merge per language rather than being replaced.
    pub fn resolve_complexity_options(&self) -> Result<CheckerOptions, ConfigError> {
        let mut options = CheckerOptions::new().with_option("detailed_report", false.into());
        let mut thresholds: BTreeMap<String, u32> = BTreeMap::new();

        if let Some(flat) = &self.cyclomatic_complexity {
            if let Some(detailed) = flat.detailed_report {
                options.insert("detailed_report", detailed.into());
            }
            for (language, threshold) in &flat.thresholds {
                thresholds.insert(language.to_ascii_lowercase(), *threshold);
            }
        }

        if let Some(overrides) = self.checker_override(COMPLEXITY_CHECKER_ID) {
            let block: Option<BTreeMap<String, u32>> = overrides.options.typed(
                COMPLEXITY_CHECKER_ID,
                "thresholds",
                "a map of language to integer",
            )?;
            let mut rest = overrides.options.clone();
            if let Some(block) = block {
                for (language, threshold) in block {
                    thresholds.insert(language.to_ascii_lowercase(), threshold);
                }
                rest.remove("thresholds");
            }
            options.merge(&rest);
        }

        if !thresholds.is_empty() {
            let value = serde_json::to_value(&thresholds).map_err(|_| ConfigError::InvalidOption {
                checker: COMPLEXITY_CHECKER_ID.to_string(),
                option: "thresholds".to_string(),
                expected: "a map of language to integer".to_string(),
            })?;
            options.insert("thresholds", value);
        }
        Ok(options)
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Normalize a checker id for lookup: `Secret_Scan` -> `secret-scan`
pub fn normalize_checker_id(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '_' | ' ' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests;
