//! Base checker trait and execution types
//!
//! This module defines the core abstractions every checker shares:
//! - `Checker` trait, the single contract the engine dispatches through
//! - `Deadline`, the absolute time budget (plus cancellation flag) passed
//!   into every invocation
//! - `CheckerOptions`, the typed view over a checker's option bag

use crate::checkers::registry::CheckerDefinition;
use crate::error::{ConfigError, ExecutionError};
use crate::models::{Finding, Repository};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Absolute deadline for one checker attempt.
///
/// Clones share the cancellation flag, so the engine can cancel an attempt
/// that is still running on another thread.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    /// Deadline `budget` from now
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// True once the deadline passed or the attempt was cancelled
    pub fn is_expired(&self) -> bool {
        self.is_cancelled() || Instant::now() >= self.at
    }

    /// Cooperative checkpoint: `Err(Timeout)` once expired
    pub fn check(&self) -> Result<(), ExecutionError> {
        if self.is_expired() {
            Err(ExecutionError::Timeout(self.budget))
        } else {
            Ok(())
        }
    }
}

/// Checker-specific key/value settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckerOptions(BTreeMap<String, serde_json::Value>);

impl CheckerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    /// Overlay `other` on top of these options, key by key
    pub fn merge(&mut self, other: &CheckerOptions) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    pub fn raw(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Get a typed option value, `None` when missing or of the wrong type
    pub fn get_option<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get an option with a default value
    pub fn get_option_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_option(key).unwrap_or(default)
    }

    /// Typed lookup that reports a present-but-mistyped value as an error
    pub fn typed<T: DeserializeOwned>(
        &self,
        checker: &str,
        key: &str,
        expected: &str,
    ) -> Result<Option<T>, ConfigError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(v) => serde_json::from_value(v.clone())
                .map(Some)
                .map_err(|_| ConfigError::InvalidOption {
                    checker: checker.to_string(),
                    option: key.to_string(),
                    expected: expected.to_string(),
                }),
        }
    }

    /// Stable hash of the option bag, used in cache keys
    pub fn fingerprint(&self) -> u64 {
        let encoded = serde_json::to_string(&self.0).unwrap_or_default();
        xxhash_rust::xxh3::xxh3_64(encoded.as_bytes())
    }
}

/// Trait for all repository checkers
///
/// Every checker, whether it scans file contents, inspects git state or
/// shells out to an external tool, implements this one contract.
///
/// # Example Implementation
///
/// ```ignore
/// pub struct MyChecker;
///
/// impl Checker for MyChecker {
///     fn id(&self) -> &'static str {
///         "my-checker"
///     }
///
///     fn description(&self) -> &'static str {
///         "Checks my specific thing"
///     }
///
///     fn default_definition(&self) -> CheckerDefinition {
///         CheckerDefinition::new(self.id(), ["quality"], Severity::Low)
///     }
///
///     fn run(
///         &self,
///         repository: &Repository,
///         definition: &CheckerDefinition,
///         deadline: &Deadline,
///     ) -> Result<Vec<Finding>, ExecutionError> {
///         deadline.check()?;
///         Ok(vec![])
///     }
/// }
/// ```
pub trait Checker: Send + Sync {
    /// Unique identifier (kebab-case, e.g. "git-status")
    fn id(&self) -> &'static str;

    /// Human-readable description of what this checker finds
    fn description(&self) -> &'static str;

    /// Built-in definition before configuration overrides
    fn default_definition(&self) -> CheckerDefinition;

    /// Reject option values of the wrong type at configuration time
    fn validate_options(&self, _definition: &CheckerDefinition) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Hash of construction-time settings that live outside the definition.
    /// Mixed into cache keys so a settings change never returns stale results.
    fn settings_fingerprint(&self) -> u64 {
        0
    }

    /// Run the check against one repository.
    ///
    /// Implementations must observe `deadline` and return
    /// `ExecutionError::Timeout` rather than block past it. The engine stops
    /// waiting at the deadline but cannot stop the attempt's thread, so a
    /// checker that ignores the deadline keeps running in the background and
    /// each retry adds another thread beyond `max_concurrency`.
    fn run(
        &self,
        repository: &Repository,
        definition: &CheckerDefinition,
        deadline: &Deadline,
    ) -> Result<Vec<Finding>, ExecutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checker_options() {
        let options = CheckerOptions::new()
            .with_option("threshold", serde_json::json!(10))
            .with_option("name", serde_json::json!("x"));

        assert_eq!(options.get_option::<i32>("threshold"), Some(10));
        assert_eq!(options.get_option_or("missing", 5), 5);
        assert_eq!(options.get_option::<u32>("name"), None);
        assert!(options
            .typed::<u32>("c", "name", "an integer")
            .is_err());
        assert_eq!(options.typed::<u32>("c", "missing", "an integer").unwrap(), None);
    }

    #[test]
    fn test_options_fingerprint_is_order_independent() {
        let a = CheckerOptions::new()
            .with_option("a", serde_json::json!(1))
            .with_option("b", serde_json::json!(2));
        let b = CheckerOptions::new()
            .with_option("b", serde_json::json!(2))
            .with_option("a", serde_json::json!(1));
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = a.clone().with_option("a", serde_json::json!(3));
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_deadline_expiry_and_cancel() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(deadline.check().is_ok());
        let shared = deadline.clone();
        shared.cancel();
        assert!(deadline.is_cancelled());
        assert_eq!(
            deadline.check(),
            Err(ExecutionError::Timeout(Duration::from_secs(60)))
        );

        let expired = Deadline::after(Duration::ZERO);
        assert!(expired.is_expired());
    }
}
