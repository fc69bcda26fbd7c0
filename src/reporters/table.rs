//! Table (terminal) reporter with colors and formatting
//!
//! Colors come from `console` and are only emitted when `color_output` is
//! set, so redirected output stays plain.

use super::{OutputFormat, Reporter, ReporterOptions};
use crate::checkers::CheckerRegistry;
use crate::error::ReportingError;
use crate::models::{Finding, HealthReport, Severity, SeverityCounts};
use console::Style;
use std::fmt::Write as _;

pub struct TableReporter;

const RULE: &str = "──────────────────────────────────────────────────────────────";

struct Palette {
    bold: Style,
    dim: Style,
    critical: Style,
    high: Style,
    medium: Style,
    low: Style,
    info: Style,
    ok: Style,
}

impl Palette {
    fn new(color: bool) -> Self {
        let make = |s: Style| s.force_styling(color);
        Self {
            bold: make(Style::new().bold()),
            dim: make(Style::new().dim()),
            critical: make(Style::new().red().bold()),
            high: make(Style::new().red()),
            medium: make(Style::new().yellow()),
            low: make(Style::new().blue()),
            info: make(Style::new().black().bright()),
            ok: make(Style::new().green()),
        }
    }

    fn severity(&self, severity: Severity) -> &Style {
        match severity {
            Severity::Critical => &self.critical,
            Severity::High => &self.high,
            Severity::Medium => &self.medium,
            Severity::Low => &self.low,
            Severity::Info => &self.info,
        }
    }
}

/// Severity tag
fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "[C]",
        Severity::High => "[H]",
        Severity::Medium => "[M]",
        Severity::Low => "[L]",
        Severity::Info => "[I]",
    }
}

fn counts_row(label: &str, counts: &SeverityCounts, p: &Palette) -> String {
    let mut row = format!("  {:<24}", truncate(label, 24));
    for severity in Severity::ALL {
        let n = counts.get(severity);
        let cell = format!("{:>9}", n);
        if n > 0 {
            let _ = write!(row, "{}", p.severity(severity).apply_to(cell));
        } else {
            let _ = write!(row, "{}", p.dim.apply_to(cell));
        }
    }
    let _ = write!(row, "{:>8}", counts.total);
    row
}

fn header_row(first: &str, p: &Palette) -> String {
    let mut row = format!("  {:<24}", first);
    for severity in Severity::ALL {
        let _ = write!(row, "{:>9}", severity.as_str().to_uppercase());
    }
    let _ = write!(row, "{:>8}", "TOTAL");
    p.bold.apply_to(row).to_string()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

/// Per-repository severity table plus the three-bucket summary
pub fn render_summary(report: &HealthReport, color: bool) -> String {
    let p = Palette::new(color);
    let mut out = String::new();
    let _ = writeln!(out, "{}", header_row("REPOSITORY", &p));
    for (name, repo) in &report.repositories {
        let _ = writeln!(out, "{}", counts_row(name, &repo.counts(), &p));
    }
    let _ = writeln!(out, "  {}", p.dim.apply_to(RULE));
    let _ = writeln!(out, "{}", counts_row("all repositories", &report.severity_counts, &p));
    out.push('\n');

    let s = &report.summary;
    let verdict = if s.critical > 0 {
        p.critical.apply_to("critical issues found")
    } else if s.warning > 0 {
        p.medium.apply_to("warnings found")
    } else {
        p.ok.apply_to("healthy")
    };
    let _ = writeln!(
        out,
        "  Critical: {}  Warning: {}  Info: {}  ({})",
        s.critical, s.warning, s.info, verdict
    );
    out
}

fn render_finding(f: &Finding, p: &Palette) -> String {
    let style = p.severity(f.severity);
    let mut line = format!(
        "    {} {}",
        style.apply_to(severity_tag(f.severity)),
        f.message
    );
    let location = f.location();
    if !location.is_empty() {
        let _ = write!(line, "\n        {}", p.dim.apply_to(location));
    }
    let _ = write!(line, "  {}", p.dim.apply_to(format!("({})", f.checker)));
    line
}

/// Findings grouped by repository, limited by `max_issues_shown`
fn render_details(report: &HealthReport, options: &ReporterOptions, p: &Palette) -> String {
    let mut out = String::new();
    for (name, repo) in &report.repositories {
        if repo.findings.is_empty() {
            continue;
        }
        let _ = writeln!(
            out,
            "\n{} {}",
            p.bold.apply_to(name),
            p.dim.apply_to(repo.path.display())
        );
        let limit = options.max_issues_shown.unwrap_or(usize::MAX);
        for f in repo.findings.iter().take(limit) {
            let _ = writeln!(out, "{}", render_finding(f, p));
        }
        if repo.findings.len() > limit {
            let _ = writeln!(
                out,
                "    {}",
                p.dim
                    .apply_to(format!("... and {} more", repo.findings.len() - limit))
            );
        }
    }
    out
}

/// Categories with their description and checkers
pub fn render_categories(registry: &CheckerRegistry, color: bool) -> String {
    let p = Palette::new(color);
    let mut out = String::new();
    for info in registry.categories() {
        let _ = writeln!(out, "{:<15} {}", p.bold.apply_to(&info.name), info.description);
        let _ = writeln!(out, "{:<15} {}", "", p.dim.apply_to(info.checkers.join(", ")));
    }
    out
}

/// Every registered checker with its state and defaults
pub fn render_checkers(registry: &CheckerRegistry, color: bool) -> String {
    let p = Palette::new(color);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        p.bold.apply_to(format!(
            "{:<24} {:<9} {:<9} {:<14} {}",
            "CHECKER", "STATE", "SEVERITY", "CATEGORIES", "DESCRIPTION"
        ))
    );
    for d in registry.definitions() {
        let state = if d.enabled {
            p.ok.apply_to(format!("{:<9}", "enabled"))
        } else {
            p.dim.apply_to(format!("{:<9}", "disabled"))
        };
        let _ = writeln!(
            out,
            "{:<24} {} {:<9} {:<14} {}",
            d.id,
            state,
            d.severity.as_str(),
            d.categories.join(","),
            d.description
        );
    }
    out
}

impl Reporter for TableReporter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Table
    }

    fn render(&self, report: &HealthReport, options: &ReporterOptions) -> Result<String, ReportingError> {
        let p = Palette::new(options.color_output);
        let mut out = String::new();

        let _ = writeln!(out, "\n{}", p.bold.apply_to(&options.title));
        let _ = writeln!(out, "{}", p.dim.apply_to(RULE));
        let _ = writeln!(
            out,
            "Repositories: {}  Checkers: {}  Findings: {}",
            report.repositories.len(),
            report.metadata.checkers.len(),
            report.total_findings()
        );
        if report.metadata.failed_tasks > 0 {
            let _ = writeln!(
                out,
                "{}",
                p.high
                    .apply_to(format!("{} task(s) failed", report.metadata.failed_tasks))
            );
        }
        out.push('\n');

        if options.show_summary {
            out.push_str(&render_summary(report, options.color_output));
            if !report.categories.is_empty() {
                let _ = writeln!(out, "\n{}", header_row("CATEGORY", &p));
                for c in &report.categories {
                    let _ = writeln!(out, "{}", counts_row(&c.category, &c.counts, &p));
                }
            }
        }

        if options.show_details {
            out.push_str(&render_details(report, options, &p));
        }

        if report.total_findings() == 0 {
            let _ = writeln!(out, "\n{}", p.ok.apply_to("No issues found."));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_report;

    #[test]
    fn test_plain_output_has_no_ansi() {
        let out = TableReporter.render(&test_report(), &ReporterOptions::default()).unwrap();
        assert!(!out.contains('\x1b'));
        assert!(out.contains("Repository Health Report"));
        assert!(out.contains("Critical: 1  Warning: 1  Info: 1"));
        assert!(out.contains("[C] Possible AWS access key"));
        assert!(out.contains("src/router.rs:42"));
        assert!(out.contains("docs"));
    }

    #[test]
    fn test_color_output() {
        let options = ReporterOptions {
            color_output: true,
            ..ReporterOptions::default()
        };
        let out = TableReporter.render(&test_report(), &options).unwrap();
        assert!(out.contains('\x1b'));
    }

    #[test]
    fn test_max_issues_shown() {
        let options = ReporterOptions {
            max_issues_shown: Some(1),
            ..ReporterOptions::default()
        };
        let out = TableReporter.render(&test_report(), &options).unwrap();
        assert!(out.contains("... and 2 more"));
        assert!(!out.contains("No LICENSE file"));
    }

    #[test]
    fn test_summary_only() {
        let options = ReporterOptions {
            show_details: false,
            ..ReporterOptions::default()
        };
        let out = TableReporter.render(&test_report(), &options).unwrap();
        assert!(out.contains("REPOSITORY"));
        assert!(!out.contains("[C]"));
    }

    #[test]
    fn test_registry_listings() {
        let registry = CheckerRegistry::with_builtin();
        let categories = render_categories(&registry, false);
        assert!(categories.contains("security"));
        assert!(categories.contains("secret-scan"));
        let checkers = render_checkers(&registry, false);
        assert!(checkers.contains("cyclomatic-complexity"));
        assert!(checkers.contains("enabled"));
    }
}
