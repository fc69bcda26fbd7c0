//! Cyclomatic complexity checker
//!
//! Walks a repository, hands each source file to the matching language
//! analyzer and reports functions above their language threshold.
//!
//! Options:
//! - `thresholds`: language id -> maximum allowed complexity
//! - `detailed_report`: also record functions within the threshold (info)

use crate::checkers::base::{Checker, Deadline};
use crate::checkers::files::{build_globset, RepoFiles};
use crate::checkers::registry::CheckerDefinition;
use crate::complexity::{
    default_analyzers, AnalyzerDefinition, ComplexityAnalyzer, FunctionComplexity,
};
use crate::error::{ConfigError, ExecutionError};
use crate::models::{Finding, Metric, Repository, Severity};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CHECKER_ID: &str = "cyclomatic-complexity";

const METRIC: &str = "cyclomatic_complexity";

/// One measured function, located in the repository
#[derive(Debug, Clone)]
struct Measured {
    file: PathBuf,
    function: FunctionComplexity,
    threshold: u32,
}

pub struct ComplexityChecker {
    analyzer: ComplexityAnalyzer,
    /// Hash of the analyzer definitions in effect
    analyzers_fingerprint: u64,
}

impl ComplexityChecker {
    /// Checker over the built-in analyzers
    pub fn new() -> Self {
        Self::with_analyzers(&default_analyzers())
    }

    /// Checker over explicit analyzer definitions.
    ///
    /// Definitions are validated when the configuration loads; any that
    /// still fail here fall back to the built-in set.
    pub fn with_analyzers(definitions: &[AnalyzerDefinition]) -> Self {
        let (analyzer, effective) = match ComplexityAnalyzer::new(definitions) {
            Ok(analyzer) => (analyzer, definitions.to_vec()),
            Err(e) => {
                warn!("Invalid analyzer definitions ({}), using built-ins", e);
                let builtin = default_analyzers();
                let analyzer = ComplexityAnalyzer::new(&builtin).unwrap_or(ComplexityAnalyzer::empty());
                (analyzer, builtin)
            }
        };
        let encoded = serde_json::to_string(&effective).unwrap_or_default();
        Self {
            analyzer,
            analyzers_fingerprint: xxhash_rust::xxh3::xxh3_64(encoded.as_bytes()),
        }
    }

    fn thresholds(definition: &CheckerDefinition) -> Result<BTreeMap<String, u32>, ConfigError> {
        Ok(definition
            .options
            .typed(&definition.id, "thresholds", "a map of language to integer")?
            .unwrap_or_default())
    }

    fn detailed(definition: &CheckerDefinition) -> Result<bool, ConfigError> {
        Ok(definition
            .options
            .typed(&definition.id, "detailed_report", "a boolean")?
            .unwrap_or(false))
    }

    fn function_finding(
        &self,
        m: &Measured,
        definition: &CheckerDefinition,
        repository: &Repository,
    ) -> Finding {
        let violation = m.function.complexity > m.threshold;
        let (severity, message) = if violation {
            (
                definition.severity,
                format!(
                    "Function '{}' has cyclomatic complexity {} (threshold {})",
                    m.function.name, m.function.complexity, m.threshold
                ),
            )
        } else {
            (
                Severity::Info,
                format!(
                    "Function '{}' has cyclomatic complexity {}",
                    m.function.name, m.function.complexity
                ),
            )
        };
        Finding::new(
            &definition.id,
            definition.primary_category(),
            severity,
            &repository.name,
            message,
        )
        .at(&m.file, Some(m.function.line))
        .with_metric(
            Metric::new(METRIC, m.function.complexity as u64).with_threshold(m.threshold as u64),
        )
    }

    /// One finding per file summarising its functions
    fn file_finding(
        &self,
        file: &Path,
        functions: &[&Measured],
        detailed: bool,
        definition: &CheckerDefinition,
        repository: &Repository,
    ) -> Option<Finding> {
        let worst = functions.iter().max_by_key(|m| m.function.complexity)?;
        let violation = worst.function.complexity > worst.threshold;
        if !violation && !detailed {
            return None;
        }
        let total: u32 = functions.iter().map(|m| m.function.complexity).sum();
        let average = total as f64 / functions.len() as f64;
        let severity = if violation { definition.severity } else { Severity::Info };
        Some(
            Finding::new(
                &definition.id,
                definition.primary_category(),
                severity,
                &repository.name,
                format!(
                    "{} function(s), highest cyclomatic complexity {} in '{}' (threshold {}), average {:.1}",
                    functions.len(),
                    worst.function.complexity,
                    worst.function.name,
                    worst.threshold,
                    average
                ),
            )
            .at(file, None)
            .with_metric(
                Metric::new(METRIC, worst.function.complexity as u64)
                    .with_threshold(worst.threshold as u64),
            ),
        )
    }
}

impl Default for ComplexityChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for ComplexityChecker {
    fn id(&self) -> &'static str {
        CHECKER_ID
    }

    fn description(&self) -> &'static str {
        "Reports functions whose cyclomatic complexity exceeds the language threshold"
    }

    fn default_definition(&self) -> CheckerDefinition {
        CheckerDefinition::new(CHECKER_ID, ["quality"], Severity::Medium)
            .with_description(self.description())
            .with_exclusions([
                "**/node_modules/**",
                "**/vendor/**",
                "**/target/**",
                "**/dist/**",
                "**/build/**",
                "**/*.min.js",
            ])
            .with_option("detailed_report", serde_json::json!(false))
    }

    fn validate_options(&self, definition: &CheckerDefinition) -> Result<(), ConfigError> {
        for language in Self::thresholds(definition)?.keys() {
            if crate::complexity::languages::syntax(language).is_none() {
                return Err(ConfigError::UnknownAnalyzer(language.clone()));
            }
        }
        Self::detailed(definition)?;
        build_globset(&definition.exclusions)?;
        Ok(())
    }

    fn settings_fingerprint(&self) -> u64 {
        self.analyzers_fingerprint
    }

    fn run(
        &self,
        repository: &Repository,
        definition: &CheckerDefinition,
        deadline: &Deadline,
    ) -> Result<Vec<Finding>, ExecutionError> {
        let to_terminal = |e: ConfigError| ExecutionError::terminal(e.to_string());
        let thresholds = Self::thresholds(definition).map_err(to_terminal)?;
        let detailed = Self::detailed(definition).map_err(to_terminal)?;
        let exclusions = build_globset(&definition.exclusions).map_err(to_terminal)?;

        let files = RepoFiles::collect(&repository.path, &exclusions, deadline)?;
        let mut measured: Vec<Measured> = Vec::new();
        let mut aggregate_files: BTreeSet<PathBuf> = BTreeSet::new();
        let mut skipped = 0usize;

        for path in files.files() {
            deadline.check()?;
            let relative = files.relative(path);
            if self.analyzer.analyzer_for(&relative).is_none() {
                continue;
            }
            let Some(source) = files.read(path) else {
                continue;
            };
            let Some(analysis) = self.analyzer.analyze_file(&relative, &source) else {
                continue;
            };
            let functions = match analysis.result {
                Ok(functions) => functions,
                Err(anomaly) => {
                    warn!(
                        "Skipping {} in {}: {}",
                        relative.display(),
                        repository.name,
                        anomaly
                    );
                    skipped += 1;
                    continue;
                }
            };
            let threshold = thresholds
                .get(&analysis.analyzer.language)
                .copied()
                .unwrap_or(analysis.analyzer.complexity_threshold);
            if !analysis.analyzer.function_level {
                aggregate_files.insert(relative.clone());
            }
            measured.extend(functions.into_iter().map(|function| Measured {
                file: relative.clone(),
                function,
                threshold,
            }));
        }

        measured.sort_by(|a, b| {
            b.function
                .complexity
                .cmp(&a.function.complexity)
                .then_with(|| a.file.cmp(&b.file))
                .then_with(|| a.function.line.cmp(&b.function.line))
        });

        let mut findings = Vec::new();
        for m in &measured {
            if aggregate_files.contains(&m.file) {
                continue;
            }
            if m.function.complexity > m.threshold || detailed {
                findings.push(self.function_finding(m, definition, repository));
            }
        }
        for file in &aggregate_files {
            let in_file: Vec<&Measured> = measured.iter().filter(|m| &m.file == file).collect();
            if let Some(finding) = self.file_finding(file, &in_file, detailed, definition, repository) {
                findings.push(finding);
            }
        }

        debug!(
            "{}: {} functions measured, {} findings, {} files skipped",
            repository.name,
            measured.len(),
            findings.len(),
            skipped
        );
        Ok(findings)
    }
}
