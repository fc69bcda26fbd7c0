//! HTML reporter with embedded styles
//!
//! Generates a standalone HTML report that can be viewed in any browser:
//! - Summary cards for the critical / warning / info buckets
//! - Per-repository severity table
//! - Findings grouped by repository
//!
//! A custom template may be configured; `{{title}}`, `{{summary}}` and
//! `{{content}}` are substituted into it.

use super::{OutputFormat, Reporter, ReporterOptions};
use crate::error::ReportingError;
use crate::models::{Finding, HealthReport, Severity};
use std::fmt::Write as _;
use std::path::Path;

pub struct HtmlReporter;

impl Reporter for HtmlReporter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Html
    }

    fn render(&self, report: &HealthReport, options: &ReporterOptions) -> Result<String, ReportingError> {
        let title = html_escape(&options.title);
        let summary = render_summary(report);
        let content = render_repositories(report);

        if let Some(template) = &options.template {
            let template = load_template(template)?;
            return Ok(template
                .replace("{{title}}", &title)
                .replace("{{summary}}", &summary)
                .replace("{{content}}", &content));
        }

        let mut html = String::new();
        html.push_str(&render_head(&title));
        html.push_str("<body>\n<div class=\"container\">\n");
        html.push_str(&render_header(report, &title));
        html.push_str("<div class=\"content\">\n");
        html.push_str(&summary);
        html.push_str(&content);
        html.push_str("</div>\n"); // content
        html.push_str(&render_footer(report));
        html.push_str("</div>\n</body>\n</html>\n");
        Ok(html)
    }
}

fn load_template(path: &Path) -> Result<String, ReportingError> {
    std::fs::read_to_string(path)
        .map_err(|e| ReportingError::Template(format!("cannot read {}: {}", path.display(), e)))
}

fn render_head(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
{CSS}
    </style>
</head>
"#
    )
}

fn render_header(report: &HealthReport, title: &str) -> String {
    let timestamp = report
        .metadata
        .generated_at
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S");
    format!(
        r#"<div class="header">
    <h1>{title}</h1>
    <p class="timestamp">Generated {timestamp}</p>
</div>
"#
    )
}

fn render_summary(report: &HealthReport) -> String {
    let s = &report.summary;
    let mut html = String::from(
        "<div class=\"section\">\n<h2 class=\"section-title\">Summary</h2>\n<div class=\"stats-grid\">\n",
    );
    for (class, label, value) in [
        ("critical", "Critical", s.critical),
        ("warning", "Warning", s.warning),
        ("info", "Info", s.info),
    ] {
        let _ = writeln!(
            html,
            "<div class=\"stat-item stat-{class}\"><div class=\"stat-value\">{value}</div><div class=\"stat-label\">{label}</div></div>"
        );
    }
    html.push_str("</div>\n");

    html.push_str("<table class=\"summary-table\">\n<thead><tr><th>Repository</th>");
    for severity in Severity::ALL {
        let _ = write!(html, "<th>{}</th>", severity.as_str());
    }
    html.push_str("<th>total</th></tr></thead>\n<tbody>\n");
    for (name, repo) in &report.repositories {
        let counts = repo.counts();
        let _ = write!(html, "<tr><td>{}</td>", html_escape(name));
        for severity in Severity::ALL {
            let _ = write!(html, "<td>{}</td>", counts.get(severity));
        }
        let _ = writeln!(html, "<td>{}</td></tr>", counts.total);
    }
    html.push_str("</tbody>\n</table>\n</div>\n");
    html
}

fn render_repositories(report: &HealthReport) -> String {
    let mut html = String::from("<div class=\"section\">\n<h2 class=\"section-title\">Findings</h2>\n");
    if report.total_findings() == 0 {
        html.push_str("<p class=\"no-findings\">No issues found.</p>\n");
    }
    for (name, repo) in &report.repositories {
        if repo.findings.is_empty() {
            continue;
        }
        let _ = writeln!(
            html,
            "<div class=\"repository\">\n<h3>{} <span class=\"path\">{}</span></h3>",
            html_escape(name),
            html_escape(&repo.path.display().to_string())
        );
        for finding in &repo.findings {
            html.push_str(&render_finding(finding));
        }
        html.push_str("</div>\n");
    }
    html.push_str("</div>\n");
    html
}

fn render_finding(finding: &Finding) -> String {
    let severity = finding.severity.as_str();
    let mut html = format!(
        "<div class=\"finding severity-{severity}\">\n    <span class=\"badge badge-{severity}\">{severity}</span>\n    <span class=\"message\">{}</span>\n",
        html_escape(&finding.message)
    );
    let location = finding.location();
    if !location.is_empty() {
        let _ = writeln!(html, "    <div class=\"location\">{}</div>", html_escape(&location));
    }
    let _ = writeln!(
        html,
        "    <div class=\"checker\">{} &middot; {}</div>\n</div>",
        html_escape(&finding.checker),
        html_escape(&finding.category)
    );
    html
}

fn render_footer(report: &HealthReport) -> String {
    format!(
        "<div class=\"footer\">\n    <p>repos-health {} &middot; {} task(s) in {} ms</p>\n</div>\n",
        html_escape(&report.metadata.tool_version),
        report.metadata.tasks,
        report.metadata.duration_ms
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// Embedded CSS
const CSS: &str = r#"
:root {
    --primary-color: #0f766e;
    --background-color: #f8fafc;
    --text-color: #1e293b;
    --card-background: white;
    --border-color: #e2e8f0;
}

* { margin: 0; padding: 0; box-sizing: border-box; }

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    line-height: 1.6;
    color: var(--text-color);
    background: var(--background-color);
    padding: 2rem;
}

.container {
    max-width: 1200px;
    margin: 0 auto;
    background: var(--card-background);
    border-radius: 12px;
    box-shadow: 0 4px 6px -1px rgba(0,0,0,0.1);
    overflow: hidden;
}

.header {
    background: linear-gradient(135deg, #0f766e 0%, #0369a1 100%);
    color: white;
    padding: 2.5rem 2rem;
    text-align: center;
}

.header h1 { font-size: 2.2rem; margin-bottom: 0.5rem; }
.header .timestamp { opacity: 0.9; font-size: 0.95rem; }

.content { padding: 2rem; }

.section { margin-bottom: 2rem; }
.section-title {
    font-size: 1.5rem;
    margin-bottom: 1rem;
    padding-bottom: 0.5rem;
    border-bottom: 2px solid var(--border-color);
}

.stats-grid {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
    gap: 1rem;
    margin-bottom: 1.5rem;
}

.stat-item {
    border: 1px solid var(--border-color);
    border-radius: 8px;
    padding: 1rem;
    text-align: center;
}
.stat-value { font-size: 2rem; font-weight: bold; }
.stat-label { color: #64748b; }
.stat-critical .stat-value { color: #dc2626; }
.stat-warning .stat-value { color: #d97706; }
.stat-info .stat-value { color: #2563eb; }

.summary-table { width: 100%; border-collapse: collapse; }
.summary-table th, .summary-table td {
    padding: 0.5rem;
    border-bottom: 1px solid var(--border-color);
    text-align: right;
}
.summary-table th:first-child, .summary-table td:first-child { text-align: left; }

.repository { margin-bottom: 1.5rem; }
.repository h3 { margin-bottom: 0.5rem; }
.repository .path { color: #64748b; font-size: 0.85rem; font-weight: normal; }

.finding {
    border-left: 4px solid var(--border-color);
    padding: 0.5rem 1rem;
    margin-bottom: 0.5rem;
    background: #f8fafc;
}
.severity-critical { border-left-color: #dc2626; }
.severity-high { border-left-color: #ea580c; }
.severity-medium { border-left-color: #d97706; }
.severity-low { border-left-color: #2563eb; }
.severity-info { border-left-color: #94a3b8; }

.badge {
    display: inline-block;
    padding: 0 0.5rem;
    border-radius: 4px;
    font-size: 0.75rem;
    text-transform: uppercase;
    color: white;
}
.badge-critical { background: #dc2626; }
.badge-high { background: #ea580c; }
.badge-medium { background: #d97706; }
.badge-low { background: #2563eb; }
.badge-info { background: #94a3b8; }

.location, .checker { color: #64748b; font-size: 0.85rem; font-family: monospace; }
.no-findings { color: #16a34a; }

.footer {
    padding: 1rem 2rem;
    text-align: center;
    color: #64748b;
    border-top: 1px solid var(--border-color);
}
"#;
