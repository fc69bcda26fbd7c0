//! Checker registry
//!
//! Holds the immutable definition of every available checker plus the
//! implementation each id dispatches to. Built once per run from the
//! configuration; read-only afterwards, so the engine shares it behind an
//! `Arc` without locking.

use crate::checkers::base::{Checker, CheckerOptions};
use crate::config::{normalize_checker_id, HealthConfig};
use crate::error::ConfigError;
use crate::models::Severity;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Timeout used when neither the checker nor the engine configures one
pub const DEFAULT_CHECKER_TIMEOUT: Duration = Duration::from_secs(60);

/// Known categories and what they cover
pub const CATEGORIES: &[(&str, &str)] = &[
    ("quality", "Code quality metrics such as cyclomatic complexity"),
    ("git", "Working tree state and commit recency"),
    ("security", "Committed secrets and unsafe file permissions"),
    ("dependencies", "Outdated third-party packages"),
    ("documentation", "README structure and license presence"),
];

pub fn category_description(name: &str) -> &'static str {
    CATEGORIES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, d)| *d)
        .unwrap_or("Custom category")
}

/// Everything the engine needs to know to schedule one checker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckerDefinition {
    pub id: String,
    pub description: String,
    /// Category tags; the first one is the category findings are filed under
    pub categories: Vec<String>,
    pub severity: Severity,
    pub enabled: bool,
    #[serde(serialize_with = "serialize_secs")]
    pub timeout: Duration,
    pub options: CheckerOptions,
    /// Globs (relative to the repository root) for paths the checker skips
    pub exclusions: Vec<String>,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl CheckerDefinition {
    pub fn new<I, S>(id: impl Into<String>, categories: I, severity: Severity) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            description: String::new(),
            categories: categories.into_iter().map(Into::into).collect(),
            severity,
            enabled: true,
            timeout: DEFAULT_CHECKER_TIMEOUT,
            options: CheckerOptions::new(),
            exclusions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key, value);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions = exclusions.into_iter().map(Into::into).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn primary_category(&self) -> &str {
        self.categories.first().map(String::as_str).unwrap_or("general")
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Hash of everything that changes what the checker produces
    pub fn fingerprint(&self) -> u64 {
        let input = format!(
            "{}\n{}\n{}\n{}\n{:016x}",
            self.id,
            self.severity,
            self.categories.join(","),
            self.exclusions.join(","),
            self.options.fingerprint()
        );
        xxhash_rust::xxh3::xxh3_64(input.as_bytes())
    }
}

/// One entry of the category listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    pub name: String,
    pub description: String,
    pub checkers: Vec<String>,
}

/// Registry of checker definitions and implementations
#[derive(Default, Clone)]
pub struct CheckerRegistry {
    definitions: Vec<CheckerDefinition>,
    checkers: HashMap<String, Arc<dyn Checker>>,
}

impl std::fmt::Debug for CheckerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckerRegistry")
            .field("definitions", &self.definitions)
            .finish()
    }
}

impl CheckerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in checker at its default definition
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for checker in crate::checkers::builtin_checkers(&[]) {
            registry.register(checker);
        }
        registry
    }

    /// Build the registry from a loaded configuration.
    ///
    /// Unknown checker ids and mistyped options fail here, before any
    /// checker runs.
    pub fn from_config(config: &HealthConfig) -> Result<Self, ConfigError> {
        let analyzers = config.analyzer_definitions()?;
        let engine = config.engine_settings()?;

        let mut registry = Self::new();
        for checker in crate::checkers::builtin_checkers(&analyzers) {
            let mut definition = checker.default_definition();
            definition.timeout = engine.timeout;
            registry.register_with(checker, definition);
        }

        for (raw_id, overrides) in &config.checkers {
            let id = normalize_checker_id(raw_id);
            let definition = registry
                .definitions
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or_else(|| ConfigError::UnknownChecker(raw_id.clone()))?;
            overrides.apply(definition)?;
        }

        if let Some(definition) = registry
            .definitions
            .iter_mut()
            .find(|d| d.id == crate::checkers::complexity::CHECKER_ID)
        {
            definition.options = config.resolve_complexity_options()?;
        }

        for definition in &registry.definitions {
            if let Some(checker) = registry.checkers.get(&definition.id) {
                checker.validate_options(definition)?;
            }
        }

        debug!(
            "Registry built with {} checkers ({} enabled)",
            registry.definitions.len(),
            registry.definitions.iter().filter(|d| d.enabled).count()
        );
        Ok(registry)
    }

    /// Register a checker at its default definition
    pub fn register(&mut self, checker: Arc<dyn Checker>) {
        let definition = checker.default_definition();
        self.register_with(checker, definition);
    }

    /// Register a checker under an explicit definition, replacing any
    /// previous registration of the same id
    pub fn register_with(&mut self, checker: Arc<dyn Checker>, definition: CheckerDefinition) {
        debug!("Registering checker: {}", definition.id);
        self.definitions.retain(|d| d.id != definition.id);
        self.checkers.insert(definition.id.clone(), checker);
        self.definitions.push(definition);
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All definitions in registration order, enabled or not
    pub fn definitions(&self) -> &[CheckerDefinition] {
        &self.definitions
    }

    /// Enabled checkers after category filtering.
    ///
    /// A non-empty include set keeps checkers carrying any included
    /// category; the exclude set then removes checkers carrying any excluded
    /// category. Disabled checkers are never returned.
    pub fn list_enabled(&self, include: &[String], exclude: &[String]) -> Vec<&CheckerDefinition> {
        self.definitions
            .iter()
            .filter(|d| d.enabled)
            .filter(|d| include.is_empty() || include.iter().any(|c| d.has_category(c)))
            .filter(|d| !exclude.iter().any(|c| d.has_category(c)))
            .collect()
    }

    /// Definition for a single checker id
    pub fn get(&self, id: &str) -> Result<&CheckerDefinition, ConfigError> {
        let id = normalize_checker_id(id);
        self.definitions
            .iter()
            .find(|d| d.id == id)
            .ok_or(ConfigError::CheckerNotFound(id))
    }

    /// Implementation a checker id dispatches to
    pub fn checker(&self, id: &str) -> Result<Arc<dyn Checker>, ConfigError> {
        let id = normalize_checker_id(id);
        self.checkers
            .get(&id)
            .cloned()
            .ok_or(ConfigError::CheckerNotFound(id))
    }

    /// Every category in use, with its description and checker ids
    pub fn categories(&self) -> Vec<CategoryInfo> {
        let mut by_category: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for definition in &self.definitions {
            for category in &definition.categories {
                by_category
                    .entry(category.as_str())
                    .or_default()
                    .push(definition.id.clone());
            }
        }
        by_category
            .into_iter()
            .map(|(name, checkers)| CategoryInfo {
                name: name.to_string(),
                description: category_description(name).to_string(),
                checkers,
            })
            .collect()
    }
}
