//! Dependency staleness
//!
//! Runs `npm outdated --json` in repositories that carry a `package.json`
//! and reports packages whose installed version lags the latest release.
//! The query hits the npm registry, so launch failures and non-JSON output
//! are transient and go through the engine's retry policy.

use crate::checkers::base::{Checker, Deadline};
use crate::checkers::external_tool::run_tool;
use crate::checkers::registry::CheckerDefinition;
use crate::error::{ConfigError, ExecutionError};
use crate::models::{Finding, Metric, Repository, Severity};
use serde_json::Value as JsonValue;
use tracing::debug;

pub const CHECKER_ID: &str = "dependency-staleness";

/// One outdated package as reported by the package manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedPackage {
    pub name: String,
    pub current: Option<String>,
    pub latest: String,
}

/// Parse `npm outdated --json` output (an object keyed by package name)
pub fn parse_npm_outdated(value: &JsonValue) -> Vec<OutdatedPackage> {
    let Some(map) = value.as_object() else {
        return Vec::new();
    };
    let mut packages: Vec<OutdatedPackage> = map
        .iter()
        .filter_map(|(name, info)| {
            let latest = info.get("latest")?.as_str()?.to_string();
            let current = info.get("current").and_then(|c| c.as_str()).map(str::to_string);
            if current.as_deref() == Some(latest.as_str()) {
                return None;
            }
            Some(OutdatedPackage {
                name: name.clone(),
                current,
                latest,
            })
        })
        .collect();
    packages.sort_by(|a, b| a.name.cmp(&b.name));
    packages
}

pub struct DependencyStalenessChecker {
    command: Vec<String>,
}

impl DependencyStalenessChecker {
    pub fn new() -> Self {
        Self::with_command(vec!["npm".into(), "outdated".into(), "--json".into()])
    }

    /// Use a different command producing npm-outdated-shaped JSON
    pub fn with_command(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Default for DependencyStalenessChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for DependencyStalenessChecker {
    fn id(&self) -> &'static str {
        CHECKER_ID
    }

    fn description(&self) -> &'static str {
        "Reports outdated npm dependencies"
    }

    fn default_definition(&self) -> CheckerDefinition {
        CheckerDefinition::new(CHECKER_ID, ["dependencies"], Severity::Medium)
            .with_description(self.description())
            .with_option("max_outdated", serde_json::json!(0))
    }

    fn validate_options(&self, definition: &CheckerDefinition) -> Result<(), ConfigError> {
        definition
            .options
            .typed::<u64>(&definition.id, "max_outdated", "an unsigned integer")?;
        Ok(())
    }

    fn run(
        &self,
        repository: &Repository,
        definition: &CheckerDefinition,
        deadline: &Deadline,
    ) -> Result<Vec<Finding>, ExecutionError> {
        if !repository.path.join("package.json").is_file() {
            debug!("{}: no package.json, skipping", repository.name);
            return Ok(vec![]);
        }
        let max_outdated: u64 = definition.options.get_option_or("max_outdated", 0);

        let output = run_tool(&self.command, "npm outdated", &repository.path, deadline)?;
        // npm outdated exits 1 when anything is outdated
        if !matches!(output.return_code, Some(0) | Some(1)) {
            return Err(ExecutionError::transient(format!(
                "npm outdated exited with {:?}: {}",
                output.return_code,
                output.stderr.trim()
            )));
        }
        let packages = match output.json_output() {
            Some(value) => parse_npm_outdated(&value),
            None if output.stdout.trim().is_empty() => Vec::new(),
            None => {
                return Err(ExecutionError::transient(
                    "npm outdated produced output that is not JSON",
                ))
            }
        };

        let count = packages.len() as u64;
        if count <= max_outdated {
            return Ok(vec![]);
        }

        let listed: Vec<String> = packages
            .iter()
            .map(|p| match &p.current {
                Some(current) => format!("{} {} -> {}", p.name, current, p.latest),
                None => format!("{} (not installed) -> {}", p.name, p.latest),
            })
            .collect();
        Ok(vec![Finding::new(
            &definition.id,
            definition.primary_category(),
            definition.severity,
            &repository.name,
            format!("{} outdated package(s): {}", count, listed.join(", ")),
        )
        .at("package.json", None)
        .with_metric(Metric::new("outdated", count).with_threshold(max_outdated))])
    }
}
