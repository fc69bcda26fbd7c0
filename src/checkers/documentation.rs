//! Documentation checkers: README structure and license presence

use crate::checkers::base::{Checker, Deadline};
use crate::checkers::registry::CheckerDefinition;
use crate::error::{ConfigError, ExecutionError};
use crate::models::{Finding, Repository, Severity};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const README_CHECKER_ID: &str = "readme-sections";
pub const LICENSE_CHECKER_ID: &str = "license-file";

const README_NAMES: &[&str] = &["README.md", "README.markdown", "README.rst", "README.txt", "README"];
const LICENSE_PREFIXES: &[&str] = &["LICENSE", "LICENCE", "COPYING"];
const DEFAULT_SECTIONS: &[&str] = &["Installation", "Usage"];

static HEADING: OnceLock<Option<Regex>> = OnceLock::new();

/// Markdown ATX headings (`## Usage`) and rst-style underlined titles are
/// both recognised
fn heading_regex() -> Option<&'static Regex> {
    HEADING
        .get_or_init(|| Regex::new(r"^\s{0,3}#{1,6}\s+(.+?)\s*#*\s*$").ok())
        .as_ref()
}

/// Headings of a README, lowercased
pub fn readme_headings(content: &str) -> Vec<String> {
    let mut headings = Vec::new();
    let lines: Vec<&str> = content.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if let Some(caps) = heading_regex().and_then(|re| re.captures(line)) {
            headings.push(caps[1].trim().to_lowercase());
            continue;
        }
        // Setext / rst: text followed by a line of = - or ~
        if let Some(next) = lines.get(i + 1) {
            let next = next.trim();
            let text = line.trim();
            if !text.is_empty()
                && next.len() >= 3
                && next.chars().all(|c| matches!(c, '=' | '-' | '~'))
            {
                headings.push(text.to_lowercase());
            }
        }
    }
    headings
}

fn find_readme(root: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    let mut names: Vec<String> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    README_NAMES
        .iter()
        .find_map(|want| names.iter().find(|n| n.eq_ignore_ascii_case(want)))
        .map(|n| root.join(n))
}

fn required_sections(definition: &CheckerDefinition) -> Result<Vec<String>, ConfigError> {
    Ok(definition
        .options
        .typed::<Vec<String>>(&definition.id, "required_sections", "a list of strings")?
        .unwrap_or_else(|| DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect()))
}

pub struct ReadmeSectionsChecker;

impl ReadmeSectionsChecker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReadmeSectionsChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for ReadmeSectionsChecker {
    fn id(&self) -> &'static str {
        README_CHECKER_ID
    }

    fn description(&self) -> &'static str {
        "Checks that a README exists and contains the required sections"
    }

    fn default_definition(&self) -> CheckerDefinition {
        CheckerDefinition::new(README_CHECKER_ID, ["documentation"], Severity::Low)
            .with_description(self.description())
            .with_option("required_sections", serde_json::json!(DEFAULT_SECTIONS))
    }

    fn validate_options(&self, definition: &CheckerDefinition) -> Result<(), ConfigError> {
        required_sections(definition).map(|_| ())
    }

    fn run(
        &self,
        repository: &Repository,
        definition: &CheckerDefinition,
        deadline: &Deadline,
    ) -> Result<Vec<Finding>, ExecutionError> {
        deadline.check()?;
        let sections =
            required_sections(definition).map_err(|e| ExecutionError::terminal(e.to_string()))?;

        let Some(readme) = find_readme(&repository.path) else {
            return Ok(vec![Finding::new(
                &definition.id,
                definition.primary_category(),
                definition.severity,
                &repository.name,
                "Repository has no README",
            )]);
        };
        let content = std::fs::read_to_string(&readme).map_err(|e| {
            ExecutionError::terminal(format!("failed to read {}: {}", readme.display(), e))
        })?;
        let headings = readme_headings(&content);
        let relative = readme
            .strip_prefix(&repository.path)
            .unwrap_or(&readme)
            .to_path_buf();

        Ok(sections
            .iter()
            .filter(|section| {
                let want = section.to_lowercase();
                !headings.iter().any(|h| h.contains(&want))
            })
            .map(|section| {
                Finding::new(
                    &definition.id,
                    definition.primary_category(),
                    definition.severity,
                    &repository.name,
                    format!("README is missing a '{}' section", section),
                )
                .at(&relative, None)
            })
            .collect())
    }
}

pub struct LicenseFileChecker;

impl LicenseFileChecker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LicenseFileChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for LicenseFileChecker {
    fn id(&self) -> &'static str {
        LICENSE_CHECKER_ID
    }

    fn description(&self) -> &'static str {
        "Checks that a LICENSE or COPYING file exists"
    }

    fn default_definition(&self) -> CheckerDefinition {
        CheckerDefinition::new(LICENSE_CHECKER_ID, ["documentation"], Severity::Low)
            .with_description(self.description())
    }

    fn run(
        &self,
        repository: &Repository,
        definition: &CheckerDefinition,
        deadline: &Deadline,
    ) -> Result<Vec<Finding>, ExecutionError> {
        deadline.check()?;
        let entries = std::fs::read_dir(&repository.path).map_err(|e| {
            ExecutionError::terminal(format!("failed to list {}: {}", repository.path.display(), e))
        })?;
        let has_license = entries.flatten().any(|e| {
            let name = e.file_name().to_string_lossy().to_uppercase();
            LICENSE_PREFIXES.iter().any(|p| name.starts_with(p))
        });
        if has_license {
            return Ok(vec![]);
        }
        Ok(vec![Finding::new(
            &definition.id,
            definition.primary_category(),
            definition.severity,
            &repository.name,
            "Repository has no LICENSE or COPYING file",
        )])
    }
}
