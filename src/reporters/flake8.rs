//! flake8-style reporter
//!
//! `path:line:col: CODE message`, one finding per line, so editors and CI
//! annotators that understand flake8 output can jump to locations. Paths
//! are joined onto the repository root; findings without a file point at
//! the repository itself.

use super::{OutputFormat, Reporter, ReporterOptions};
use crate::error::ReportingError;
use crate::models::{HealthReport, Severity};

pub struct Flake8Reporter;

/// flake8-style code per severity: errors, warnings, informational
fn severity_code(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "E100",
        Severity::High => "E200",
        Severity::Medium => "W300",
        Severity::Low => "I400",
        Severity::Info => "I500",
    }
}

impl Reporter for Flake8Reporter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Flake8
    }

    fn render(&self, report: &HealthReport, _options: &ReporterOptions) -> Result<String, ReportingError> {
        let mut out = String::new();
        for repo in report.repositories.values() {
            for f in &repo.findings {
                let path = match &f.file {
                    Some(file) => repo.path.join(file),
                    None => repo.path.clone(),
                };
                out.push_str(&format!(
                    "{}:{}:1: {} [{}] {}\n",
                    path.display(),
                    f.line.unwrap_or(1),
                    severity_code(f.severity),
                    f.checker,
                    f.message.replace('\n', " ")
                ));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_report;

    #[test]
    fn test_flake8_lines() {
        let out = Flake8Reporter.render(&test_report(), &ReporterOptions::default()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("/srv/api/config/settings.py:7:1: E100 [secret-scan] "));
        assert_eq!(
            lines[1],
            "/srv/api/src/router.rs:42:1: W300 [cyclomatic-complexity] Function 'route' has cyclomatic complexity 14 (threshold 10)"
        );
        assert_eq!(lines[2], "/srv/api:1:1: I400 [license-file] No LICENSE file");
    }
}
