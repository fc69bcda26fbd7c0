//! Repository health checkers
//!
//! Every checker implements the single [`Checker`] contract and is
//! dispatched by id through the [`CheckerRegistry`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CheckerRegistry                        │
//! │  - Holds one CheckerDefinition per checker id               │
//! │  - Applies configuration overrides and validates options   │
//! │  - Filters by category include/exclude                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Checker Trait                          │
//! │  - id(), description(), default_definition()                │
//! │  - run(repository, definition, deadline) -> findings        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┼───────────────┐
//!              ▼               ▼               ▼
//! ┌──────────────────┐ ┌──────────────┐ ┌──────────────────┐
//! │ File scanning    │ │ Git plumbing │ │ External tools   │
//! │ (complexity,     │ │ (status,     │ │ (npm outdated)   │
//! │  secrets, perms, │ │  last commit)│ │                  │
//! │  documentation)  │ │              │ │                  │
//! └──────────────────┘ └──────────────┘ └──────────────────┘
//! ```
//!
//! # Built-in checkers
//!
//! - `cyclomatic-complexity` (quality) - functions above the language threshold
//! - `git-status` (git) - uncommitted and untracked files
//! - `git-last-commit` (git) - stale HEAD commit
//! - `secret-scan` (security) - hardcoded credentials
//! - `file-permissions` (security) - world-writable files, exposed keys
//! - `dependency-staleness` (dependencies) - outdated npm packages
//! - `readme-sections` (documentation) - README with required headings
//! - `license-file` (documentation) - LICENSE present

mod base;
pub mod complexity;
pub mod dependencies;
pub mod documentation;
pub mod external_tool;
pub mod files;
pub mod git;
pub mod permissions;
mod registry;
pub mod secrets;

pub use base::{Checker, CheckerOptions, Deadline};
pub use complexity::ComplexityChecker;
pub use dependencies::DependencyStalenessChecker;
pub use documentation::{LicenseFileChecker, ReadmeSectionsChecker};
pub use git::{GitLastCommitChecker, GitStatusChecker};
pub use permissions::FilePermissionsChecker;
pub use registry::{
    category_description, CategoryInfo, CheckerDefinition, CheckerRegistry, CATEGORIES,
    DEFAULT_CHECKER_TIMEOUT,
};
pub use secrets::SecretScanChecker;

use crate::complexity::AnalyzerDefinition;
use std::sync::Arc;

/// Every built-in checker, in registration order.
///
/// `analyzers` configures the complexity checker; an empty slice selects
/// the built-in analyzer set.
pub fn builtin_checkers(analyzers: &[AnalyzerDefinition]) -> Vec<Arc<dyn Checker>> {
    let complexity = if analyzers.is_empty() {
        ComplexityChecker::new()
    } else {
        ComplexityChecker::with_analyzers(analyzers)
    };
    vec![
        Arc::new(complexity),
        Arc::new(GitStatusChecker::new()),
        Arc::new(GitLastCommitChecker::new()),
        Arc::new(SecretScanChecker::new()),
        Arc::new(FilePermissionsChecker::new()),
        Arc::new(DependencyStalenessChecker::new()),
        Arc::new(ReadmeSectionsChecker::new()),
        Arc::new(LicenseFileChecker::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_ids_are_unique_and_match_definitions() {
        let checkers = builtin_checkers(&[]);
        assert_eq!(checkers.len(), 8);
        let ids: HashSet<_> = checkers.iter().map(|c| c.id()).collect();
        assert_eq!(ids.len(), 8);
        for checker in &checkers {
            let definition = checker.default_definition();
            assert_eq!(definition.id, checker.id());
            assert!(!definition.categories.is_empty());
            assert!(checker.validate_options(&definition).is_ok(), "{}", checker.id());
        }
    }

    #[test]
    fn test_builtin_categories() {
        let registry = CheckerRegistry::with_builtin();
        let names: Vec<_> = registry.categories().into_iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec!["dependencies", "documentation", "git", "quality", "security"]
        );
    }
}
