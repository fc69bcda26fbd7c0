//! Git state checkers
//!
//! `git-status` counts uncommitted and untracked paths in the working tree;
//! `git-last-commit` flags repositories whose HEAD commit is older than a
//! configured number of days. Both read git plumbing through `git2`, so no
//! `git` executable is needed.

use crate::checkers::base::{Checker, Deadline};
use crate::checkers::registry::CheckerDefinition;
use crate::error::{ConfigError, ExecutionError};
use crate::models::{Finding, Metric, Repository, Severity};
use chrono::{TimeZone, Utc};
use git2::{ErrorCode, Status, StatusOptions};
use tracing::debug;

pub const STATUS_CHECKER_ID: &str = "git-status";
pub const LAST_COMMIT_CHECKER_ID: &str = "git-last-commit";

const DEFAULT_MAX_AGE_DAYS: u64 = 90;

/// Open the repository rooted exactly at `path`.
///
/// A directory that is not a git repository is a terminal error: retrying
/// cannot change the answer.
fn open_repository(repository: &Repository) -> Result<git2::Repository, ExecutionError> {
    let repo = git2::Repository::open(&repository.path).map_err(|e| {
        ExecutionError::terminal(format!(
            "{} is not a git repository: {}",
            repository.path.display(),
            e.message()
        ))
    })?;
    debug!("Opened git repository at {:?}", repo.path());
    Ok(repo)
}

/// Working tree counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkingTreeCounts {
    pub uncommitted: u64,
    pub untracked: u64,
}

/// Count uncommitted (staged or modified) and untracked paths
pub fn working_tree_counts(repo: &git2::Repository) -> Result<WorkingTreeCounts, git2::Error> {
    let mut options = StatusOptions::new();
    options
        .include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .exclude_submodules(true);

    let mut counts = WorkingTreeCounts::default();
    for entry in repo.statuses(Some(&mut options))?.iter() {
        let status = entry.status();
        if status.contains(Status::IGNORED) {
            continue;
        }
        if status == Status::WT_NEW {
            counts.untracked += 1;
        } else if !status.is_empty() {
            counts.uncommitted += 1;
        }
    }
    Ok(counts)
}

fn limit_option(definition: &CheckerDefinition, key: &str) -> Result<u64, ConfigError> {
    Ok(definition
        .options
        .typed::<u64>(&definition.id, key, "an unsigned integer")?
        .unwrap_or(0))
}

pub struct GitStatusChecker;

impl GitStatusChecker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GitStatusChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for GitStatusChecker {
    fn id(&self) -> &'static str {
        STATUS_CHECKER_ID
    }

    fn description(&self) -> &'static str {
        "Reports uncommitted and untracked changes in the working tree"
    }

    fn default_definition(&self) -> CheckerDefinition {
        CheckerDefinition::new(STATUS_CHECKER_ID, ["git"], Severity::Medium)
            .with_description(self.description())
            .with_option("max_uncommitted", serde_json::json!(0))
            .with_option("max_untracked", serde_json::json!(0))
    }

    fn validate_options(&self, definition: &CheckerDefinition) -> Result<(), ConfigError> {
        limit_option(definition, "max_uncommitted")?;
        limit_option(definition, "max_untracked")?;
        Ok(())
    }

    fn run(
        &self,
        repository: &Repository,
        definition: &CheckerDefinition,
        deadline: &Deadline,
    ) -> Result<Vec<Finding>, ExecutionError> {
        let max_uncommitted = limit_option(definition, "max_uncommitted")
            .map_err(|e| ExecutionError::terminal(e.to_string()))?;
        let max_untracked = limit_option(definition, "max_untracked")
            .map_err(|e| ExecutionError::terminal(e.to_string()))?;

        let repo = open_repository(repository)?;
        deadline.check()?;
        if repo.is_bare() {
            return Err(ExecutionError::terminal("bare repository has no working tree"));
        }
        let counts = working_tree_counts(&repo)
            .map_err(|e| ExecutionError::terminal(format!("failed to read status: {}", e.message())))?;
        deadline.check()?;

        let mut findings = Vec::new();
        if counts.uncommitted > max_uncommitted {
            findings.push(
                Finding::new(
                    &definition.id,
                    definition.primary_category(),
                    definition.severity,
                    &repository.name,
                    format!(
                        "{} uncommitted change(s) in the working tree (limit {})",
                        counts.uncommitted, max_uncommitted
                    ),
                )
                .with_metric(Metric::new("uncommitted", counts.uncommitted).with_threshold(max_uncommitted)),
            );
        }
        if counts.untracked > max_untracked {
            findings.push(
                Finding::new(
                    &definition.id,
                    definition.primary_category(),
                    definition.severity,
                    &repository.name,
                    format!(
                        "{} untracked file(s) in the working tree (limit {})",
                        counts.untracked, max_untracked
                    ),
                )
                .with_metric(Metric::new("untracked", counts.untracked).with_threshold(max_untracked)),
            );
        }
        Ok(findings)
    }
}

pub struct GitLastCommitChecker;

impl GitLastCommitChecker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GitLastCommitChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for GitLastCommitChecker {
    fn id(&self) -> &'static str {
        LAST_COMMIT_CHECKER_ID
    }

    fn description(&self) -> &'static str {
        "Flags repositories without recent commits"
    }

    fn default_definition(&self) -> CheckerDefinition {
        CheckerDefinition::new(LAST_COMMIT_CHECKER_ID, ["git"], Severity::Low)
            .with_description(self.description())
            .with_option("max_age_days", serde_json::json!(DEFAULT_MAX_AGE_DAYS))
    }

    fn validate_options(&self, definition: &CheckerDefinition) -> Result<(), ConfigError> {
        definition
            .options
            .typed::<u64>(&definition.id, "max_age_days", "an unsigned integer")?;
        Ok(())
    }

    fn run(
        &self,
        repository: &Repository,
        definition: &CheckerDefinition,
        deadline: &Deadline,
    ) -> Result<Vec<Finding>, ExecutionError> {
        let max_age_days = definition
            .options
            .get_option_or("max_age_days", DEFAULT_MAX_AGE_DAYS);
        let repo = open_repository(repository)?;
        deadline.check()?;

        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                return Ok(vec![Finding::new(
                    &definition.id,
                    definition.primary_category(),
                    definition.severity,
                    &repository.name,
                    "Repository has no commits",
                )]);
            }
            Err(e) => {
                return Err(ExecutionError::terminal(format!(
                    "failed to resolve HEAD: {}",
                    e.message()
                )))
            }
        };
        let commit = head
            .peel_to_commit()
            .map_err(|e| ExecutionError::terminal(format!("HEAD is not a commit: {}", e.message())))?;

        let Some(committed_at) = Utc.timestamp_opt(commit.time().seconds(), 0).single() else {
            return Err(ExecutionError::terminal("HEAD commit has an invalid timestamp"));
        };
        let age_days = (Utc::now() - committed_at).num_days().max(0) as u64;
        if age_days <= max_age_days {
            return Ok(vec![]);
        }

        Ok(vec![Finding::new(
            &definition.id,
            definition.primary_category(),
            definition.severity,
            &repository.name,
            format!(
                "Last commit was {} days ago on {} (limit {} days)",
                age_days,
                committed_at.format("%Y-%m-%d"),
                max_age_days
            ),
        )
        .with_metric(Metric::new("age_days", age_days).with_threshold(max_age_days))])
    }
}
