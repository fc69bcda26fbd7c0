//! Report aggregation
//!
//! A pure function from task outcomes to a [`HealthReport`]: every
//! repository appears (even with no findings), findings are sorted
//! deterministically and every count is derived from the final lists, so
//! aggregating the same outcomes twice yields identical summaries.

use crate::engine::{TaskOutcome, TaskState};
use crate::models::{
    CategorySummary, Finding, HealthReport, ReportMetadata, Repository, RepositoryReport,
    Severity, SeverityCounts, Summary,
};
use std::collections::{BTreeMap, BTreeSet};

/// Report order: severity (highest first), then file, then line, then
/// checker and message so ties are stable too
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.line.cmp(&b.line))
            .then_with(|| a.checker.cmp(&b.checker))
            .then_with(|| a.message.cmp(&b.message))
    });
}

/// Build the report from collected outcomes.
///
/// Findings below `threshold` are dropped before anything is counted.
/// Outcomes for repositories not in `repositories` are still reported.
pub fn aggregate(
    outcomes: &[TaskOutcome],
    repositories: &[Repository],
    threshold: Option<Severity>,
) -> HealthReport {
    let mut reports: BTreeMap<String, RepositoryReport> = repositories
        .iter()
        .map(|r| {
            (
                r.name.clone(),
                RepositoryReport {
                    path: r.path.clone(),
                    tags: r.tags.clone(),
                    findings: Vec::new(),
                },
            )
        })
        .collect();

    for outcome in outcomes {
        let report = reports.entry(outcome.repository.clone()).or_default();
        report.findings.extend(
            outcome
                .findings
                .iter()
                .filter(|f| threshold.map_or(true, |min| f.severity >= min))
                .cloned(),
        );
    }

    let mut severity_counts = SeverityCounts::default();
    let mut by_category: BTreeMap<String, SeverityCounts> = BTreeMap::new();
    for report in reports.values_mut() {
        sort_findings(&mut report.findings);
        for finding in &report.findings {
            severity_counts.record(finding.severity);
            by_category
                .entry(finding.category.clone())
                .or_default()
                .record(finding.severity);
        }
    }

    let checkers: BTreeSet<String> = outcomes.iter().map(|o| o.checker.clone()).collect();
    let metadata = ReportMetadata {
        checkers: checkers.into_iter().collect(),
        tasks: outcomes.len(),
        cache_hits: outcomes.iter().filter(|o| o.state == TaskState::CacheHit).count(),
        cache_misses: outcomes.iter().filter(|o| o.cache_miss).count(),
        failed_tasks: outcomes.iter().filter(|o| o.state == TaskState::Failed).count(),
        ..ReportMetadata::default()
    };

    HealthReport {
        repositories: reports,
        summary: Summary::from_counts(&severity_counts),
        severity_counts,
        categories: by_category
            .into_iter()
            .map(|(category, counts)| CategorySummary { category, counts })
            .collect(),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn outcome(repo: &str, checker: &str, state: TaskState, findings: Vec<Finding>) -> TaskOutcome {
        TaskOutcome {
            repository: repo.into(),
            checker: checker.into(),
            state,
            findings,
            attempts: 1,
            cache_miss: state == TaskState::Succeeded,
            error: None,
            duration: Duration::from_millis(3),
        }
    }

    fn finding(repo: &str, category: &str, severity: Severity, file: &str, line: u32) -> Finding {
        Finding::new("c", category, severity, repo, format!("{file}:{line}")).at(file, Some(line))
    }

    fn sample() -> (Vec<TaskOutcome>, Vec<Repository>) {
        let outcomes = vec![
            outcome(
                "api",
                "secret-scan",
                TaskState::Succeeded,
                vec![
                    finding("api", "security", Severity::Low, "b.rs", 1),
                    finding("api", "security", Severity::Critical, "z.rs", 9),
                ],
            ),
            outcome(
                "api",
                "cyclomatic-complexity",
                TaskState::CacheHit,
                vec![
                    finding("api", "quality", Severity::Medium, "a.rs", 20),
                    finding("api", "quality", Severity::Medium, "a.rs", 3),
                ],
            ),
            outcome(
                "web",
                "git-status",
                TaskState::Failed,
                vec![finding("web", "git", Severity::High, "", 0)],
            ),
        ];
        let repos = vec![
            Repository::new("api", "/r/api"),
            Repository::new("web", "/r/web"),
            Repository::new("docs", "/r/docs"),
        ];
        (outcomes, repos)
    }

    #[test]
    fn test_summary_mapping_and_exit_code() {
        let (outcomes, repos) = sample();
        let report = aggregate(&outcomes, &repos, None);
        assert_eq!(report.summary, Summary { critical: 1, warning: 3, info: 1 });
        assert_eq!(report.summary.total(), report.total_findings());
        assert_eq!(report.severity_counts.medium, 2);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_clean_repositories_are_listed() {
        let (outcomes, repos) = sample();
        let report = aggregate(&outcomes, &repos, None);
        assert!(report.repositories["docs"].findings.is_empty());
        assert_eq!(report.repositories["docs"].path, std::path::PathBuf::from("/r/docs"));
    }

    #[test]
    fn test_findings_sorted_by_severity_then_location() {
        let (outcomes, repos) = sample();
        let report = aggregate(&outcomes, &repos, None);
        let order: Vec<_> = report.repositories["api"]
            .findings
            .iter()
            .map(|f| f.message.as_str())
            .collect();
        assert_eq!(order, vec!["z.rs:9", "a.rs:3", "a.rs:20", "b.rs:1"]);
    }

    #[test]
    fn test_aggregation_is_idempotent_and_order_independent() {
        let (mut outcomes, repos) = sample();
        let first = aggregate(&outcomes, &repos, None);
        outcomes.reverse();
        let second = aggregate(&outcomes, &repos, None);
        assert_eq!(first.summary, second.summary);
        assert_eq!(first.severity_counts, second.severity_counts);
        assert_eq!(first.categories, second.categories);
        assert_eq!(first.repositories, second.repositories);
    }

    #[test]
    fn test_threshold_and_metadata() {
        let (outcomes, repos) = sample();
        let report = aggregate(&outcomes, &repos, Some(Severity::High));
        assert_eq!(report.total_findings(), 2);
        assert_eq!(report.summary.info, 0);
        assert_eq!(report.metadata.tasks, 3);
        assert_eq!(report.metadata.cache_hits, 1);
        assert_eq!(report.metadata.cache_misses, 1);
        assert_eq!(report.metadata.failed_tasks, 1);
        assert_eq!(
            report.metadata.checkers,
            vec!["cyclomatic-complexity", "git-status", "secret-scan"]
        );
        let categories: Vec<_> = report.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(categories, vec!["git", "security"]);
    }
}
