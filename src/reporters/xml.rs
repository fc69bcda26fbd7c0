//! XML reporter
//!
//! ```xml
//! <health-report tool-version="..." generated="..." duration-ms="...">
//!   <summary critical="1" warning="2" info="0"/>
//!   <repository name="api" path="/srv/api">
//!     <finding id="..." checker="..." category="..." severity="high" file="..." line="3">
//!       <message>...</message>
//!     </finding>
//!   </repository>
//! </health-report>
//! ```

use super::{OutputFormat, Reporter, ReporterOptions};
use crate::error::ReportingError;
use crate::models::HealthReport;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

pub struct XmlReporter;

struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), ReportingError> {
        self.writer
            .write_event(event)
            .map_err(|e| ReportingError::Serialize(e.to_string()))
    }

    fn element<'a>(name: &'a str, attrs: &[(&str, &str)]) -> BytesStart<'a> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        start
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ReportingError> {
        self.event(Event::Start(Self::element(name, attrs)))
    }

    fn close(&mut self, name: &str) -> Result<(), ReportingError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ReportingError> {
        self.event(Event::Empty(Self::element(name, attrs)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<(), ReportingError> {
        self.open(name, &[])?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn finish(self) -> Result<String, ReportingError> {
        String::from_utf8(self.writer.into_inner()).map_err(|e| ReportingError::Serialize(e.to_string()))
    }
}

impl Reporter for XmlReporter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Xml
    }

    fn render(&self, report: &HealthReport, options: &ReporterOptions) -> Result<String, ReportingError> {
        let mut xml = XmlOut::new();
        xml.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let generated = report.metadata.generated_at.to_rfc3339();
        let duration = report.metadata.duration_ms.to_string();
        let version = report.metadata.tool_version.as_str();
        let mut root: Vec<(&str, &str)> = vec![("tool-version", version)];
        if options.include_timestamps {
            root.push(("generated", generated.as_str()));
            root.push(("duration-ms", duration.as_str()));
        }
        xml.open("health-report", &root)?;

        let s = &report.summary;
        let (critical, warning, info) = (s.critical.to_string(), s.warning.to_string(), s.info.to_string());
        xml.empty(
            "summary",
            &[
                ("critical", critical.as_str()),
                ("warning", warning.as_str()),
                ("info", info.as_str()),
            ],
        )?;

        for (name, repo) in &report.repositories {
            let path = repo.path.display().to_string();
            let tags = repo.tags.join(",");
            let mut attrs: Vec<(&str, &str)> = vec![("name", name.as_str()), ("path", path.as_str())];
            if !tags.is_empty() {
                attrs.push(("tags", tags.as_str()));
            }
            if repo.findings.is_empty() {
                xml.empty("repository", &attrs)?;
                continue;
            }
            xml.open("repository", &attrs)?;
            for f in &repo.findings {
                let file = f.file.as_ref().map(|p| p.display().to_string());
                let line = f.line.map(|l| l.to_string());
                let mut attrs: Vec<(&str, &str)> = vec![
                    ("id", f.id.as_str()),
                    ("checker", f.checker.as_str()),
                    ("category", f.category.as_str()),
                    ("severity", f.severity.as_str()),
                ];
                if let Some(file) = &file {
                    attrs.push(("file", file.as_str()));
                }
                if let Some(line) = &line {
                    attrs.push(("line", line.as_str()));
                }
                xml.open("finding", &attrs)?;
                xml.text_element("message", &f.message)?;
                if let Some(metric) = &f.metric {
                    let value = metric.value.to_string();
                    let threshold = metric.threshold.map(|t| t.to_string());
                    let mut attrs: Vec<(&str, &str)> = vec![("name", metric.name.as_str()), ("value", value.as_str())];
                    if let Some(threshold) = &threshold {
                        attrs.push(("threshold", threshold.as_str()));
                    }
                    xml.empty("metric", &attrs)?;
                }
                xml.close("finding")?;
            }
            xml.close("repository")?;
        }

        xml.close("health-report")?;
        xml.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_report;

    #[test]
    fn test_xml_structure_and_escaping() {
        let out = XmlReporter.render(&test_report(), &ReporterOptions::default()).unwrap();
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(out.contains("<summary critical=\"1\" warning=\"1\" info=\"1\"/>"));
        assert!(out.contains("<repository name=\"docs\" path=\"/srv/docs\"/>"));
        assert!(out.contains("&lt;escaped&gt;"));
        assert!(out.contains("threshold=\"10\""));
        assert!(out.contains("generated="));
    }

    #[test]
    fn test_xml_without_timestamps() {
        let options = ReporterOptions {
            include_timestamps: false,
            ..ReporterOptions::default()
        };
        let out = XmlReporter.render(&test_report(), &options).unwrap();
        assert!(!out.contains("generated="));
        assert!(!out.contains("duration-ms="));
    }
}
