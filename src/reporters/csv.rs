//! CSV reporter
//!
//! One row per finding with a fixed header. Clean repositories produce no
//! rows.

use super::{OutputFormat, Reporter, ReporterOptions};
use crate::error::ReportingError;
use crate::models::HealthReport;

pub struct CsvReporter;

const HEADER: &str = "repository,checker,category,severity,file,line,message,metric,value,threshold";

/// Quote a field when it contains a separator, quote or line break
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl Reporter for CsvReporter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Csv
    }

    fn render(&self, report: &HealthReport, _options: &ReporterOptions) -> Result<String, ReportingError> {
        let mut out = String::from(HEADER);
        out.push('\n');
        for f in report.findings() {
            let file = f.file.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
            let line = f.line.map(|l| l.to_string()).unwrap_or_default();
            let (metric, value, threshold) = match &f.metric {
                Some(m) => (
                    m.name.clone(),
                    m.value.to_string(),
                    m.threshold.map(|t| t.to_string()).unwrap_or_default(),
                ),
                None => Default::default(),
            };
            let row = [
                escape(&f.repository),
                escape(&f.checker),
                escape(&f.category),
                f.severity.as_str().to_string(),
                escape(&file),
                line,
                escape(&f.message),
                escape(&metric),
                value,
                threshold,
            ];
            out.push_str(&row.join(","));
            out.push('\n');
        }
        Ok(out)
    }
}
