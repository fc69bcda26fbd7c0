//! JSON reporter
//!
//! Outputs the HealthReport as JSON, pretty-printed unless `pretty_print`
//! is off. Useful for machine consumption, piping to jq, or further
//! processing.

use super::{OutputFormat, Reporter, ReporterOptions};
use crate::error::ReportingError;
use crate::models::HealthReport;
use serde_json::Value;

pub struct JsonReporter;

/// The report as a JSON value, without `metadata` unless requested
pub(super) fn to_value(report: &HealthReport, include_metadata: bool) -> Result<Value, ReportingError> {
    let mut value =
        serde_json::to_value(report).map_err(|e| ReportingError::Serialize(e.to_string()))?;
    if !include_metadata {
        if let Value::Object(map) = &mut value {
            map.remove("metadata");
        }
    }
    Ok(value)
}

impl Reporter for JsonReporter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn render(&self, report: &HealthReport, options: &ReporterOptions) -> Result<String, ReportingError> {
        let value = to_value(report, options.include_metadata)?;
        let rendered = if options.pretty_print {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        rendered.map_err(|e| ReportingError::Serialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_report;

    #[test]
    fn test_json_render_valid() {
        let report = test_report();
        let json_str = JsonReporter.render(&report, &ReporterOptions::default()).expect("render JSON");
        let parsed: Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["summary"]["critical"], 1);
        assert_eq!(parsed["summary"]["warning"], 1);
        assert_eq!(parsed["summary"]["info"], 1);
        assert_eq!(parsed["repositories"]["api"]["findings"].as_array().unwrap().len(), 3);
        assert_eq!(parsed["repositories"]["docs"]["findings"].as_array().unwrap().len(), 0);
        assert!(parsed.get("metadata").is_some());
    }

    #[test]
    fn test_json_render_compact_without_metadata() {
        let options = ReporterOptions {
            pretty_print: false,
            include_metadata: false,
            ..ReporterOptions::default()
        };
        let json_str = JsonReporter.render(&test_report(), &options).expect("render compact JSON");
        assert!(!json_str.contains('\n'));
        let parsed: Value = serde_json::from_str(&json_str).expect("parse compact JSON");
        assert!(parsed.get("metadata").is_none());
    }
}
