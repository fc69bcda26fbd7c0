//! YAML reporter

use super::{json, OutputFormat, Reporter, ReporterOptions};
use crate::error::ReportingError;
use crate::models::HealthReport;

pub struct YamlReporter;

impl Reporter for YamlReporter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Yaml
    }

    fn render(&self, report: &HealthReport, options: &ReporterOptions) -> Result<String, ReportingError> {
        let value = json::to_value(report, options.include_metadata)?;
        serde_yaml::to_string(&value).map_err(|e| ReportingError::Serialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_report;

    #[test]
    fn test_yaml_parses_back() {
        let out = YamlReporter.render(&test_report(), &ReporterOptions::default()).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(parsed["summary"]["critical"].as_u64(), Some(1));
        assert_eq!(
            parsed["repositories"]["api"]["tags"][0].as_str(),
            Some("backend")
        );
    }

    #[test]
    fn test_yaml_without_metadata() {
        let options = ReporterOptions {
            include_metadata: false,
            ..ReporterOptions::default()
        };
        let out = YamlReporter.render(&test_report(), &options).unwrap();
        assert!(!out.contains("tool_version"));
    }
}
