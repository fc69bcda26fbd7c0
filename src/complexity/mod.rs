//! Lexical cyclomatic-complexity analysis
//!
//! For a source file this module produces `(function, start line,
//! complexity)` triples without building an AST:
//!
//! 1. Comments and string contents are masked ([`scanner`]).
//! 2. Function boundaries are tracked by braces or indentation
//!    ([`blocks`]), using per-language header patterns ([`languages`]).
//! 3. Each decision point (`if`, `elif`, `for`, `while`, `case`, `catch`/
//!    `except`, `&&`/`||`/`and`/`or`) adds one to the innermost function,
//!    starting from a baseline of 1.
//!
//! Files the scanner cannot make sense of (unterminated literals,
//! unbalanced braces) yield a [`ScanAnomaly`]; callers skip the file.

pub mod blocks;
pub mod languages;
pub mod scanner;

use crate::checkers::files::build_globset;
use crate::error::ConfigError;
use globset::GlobSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use languages::{supported_languages, BlockStyle};
pub use scanner::ScanAnomaly;

pub const DEFAULT_COMPLEXITY_THRESHOLD: u32 = 10;

/// Complexity of one function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionComplexity {
    pub name: String,
    pub line: u32,
    pub complexity: u32,
}

/// Per-language analyzer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerDefinition {
    pub language: String,
    pub enabled: bool,
    pub file_extensions: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub complexity_threshold: u32,
    /// Report each function; when false only a per-file aggregate is kept
    pub function_level: bool,
}

impl AnalyzerDefinition {
    /// Built-in definition for a supported language
    pub fn builtin(language: &str) -> Option<Self> {
        let syntax = languages::syntax(language)?;
        Some(Self {
            language: syntax.id.to_string(),
            enabled: true,
            file_extensions: syntax.extensions.iter().map(|e| e.to_string()).collect(),
            exclude_patterns: syntax.test_patterns.iter().map(|p| p.to_string()).collect(),
            complexity_threshold: DEFAULT_COMPLEXITY_THRESHOLD,
            function_level: true,
        })
    }
}

/// One built-in definition per supported language
pub fn default_analyzers() -> Vec<AnalyzerDefinition> {
    supported_languages()
        .filter_map(AnalyzerDefinition::builtin)
        .collect()
}

/// Analyze source text in a supported language
pub fn analyze_source(
    language: &str,
    source: &str,
) -> Result<Vec<FunctionComplexity>, ScanAnomaly> {
    let Some(compiled) = languages::language(language) else {
        return Err(ScanAnomaly::new(0, format!("unsupported language '{}'", language)));
    };
    if source.trim().is_empty() {
        return Ok(Vec::new());
    }
    let masked = scanner::mask_non_code(source, compiled.syntax)?;
    match compiled.syntax.style {
        BlockStyle::Braces => blocks::scan_braces(&masked.text, compiled),
        BlockStyle::Indentation => blocks::scan_indentation(&masked, compiled),
    }
}

/// Result of analyzing one file
#[derive(Debug, Clone)]
pub struct FileAnalysis<'a> {
    pub analyzer: &'a AnalyzerDefinition,
    pub result: Result<Vec<FunctionComplexity>, ScanAnomaly>,
}

struct ActiveAnalyzer {
    definition: AnalyzerDefinition,
    exclusions: GlobSet,
}

/// The set of enabled analyzers, dispatching files by extension
pub struct ComplexityAnalyzer {
    analyzers: Vec<ActiveAnalyzer>,
}

impl ComplexityAnalyzer {
    /// Enabled analyzers only; unknown languages and bad globs are
    /// configuration errors
    pub fn new(definitions: &[AnalyzerDefinition]) -> Result<Self, ConfigError> {
        let mut analyzers = Vec::new();
        for definition in definitions {
            if languages::syntax(&definition.language).is_none() {
                return Err(ConfigError::UnknownAnalyzer(definition.language.clone()));
            }
            if !definition.enabled {
                continue;
            }
            analyzers.push(ActiveAnalyzer {
                exclusions: build_globset(&definition.exclude_patterns)?,
                definition: definition.clone(),
            });
        }
        Ok(Self { analyzers })
    }

    /// Analyzer that covers no files
    pub fn empty() -> Self {
        Self {
            analyzers: Vec::new(),
        }
    }

    pub fn definitions(&self) -> impl Iterator<Item = &AnalyzerDefinition> {
        self.analyzers.iter().map(|a| &a.definition)
    }

    /// Analyzer responsible for a repository-relative path, if any.
    ///
    /// Paths matching the analyzer's exclusion globs are not analyzed.
    pub fn analyzer_for(&self, relative: &Path) -> Option<&AnalyzerDefinition> {
        let ext = relative.extension()?.to_str()?;
        let active = self.analyzers.iter().find(|a| {
            a.definition
                .file_extensions
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })?;
        if active.exclusions.is_match(relative) {
            return None;
        }
        Some(&active.definition)
    }

    /// Analyze one file; `None` when no analyzer covers it
    pub fn analyze_file(&self, relative: &Path, source: &str) -> Option<FileAnalysis<'_>> {
        let analyzer = self.analyzer_for(relative)?;
        Some(FileAnalysis {
            analyzer,
            result: analyze_source(&analyzer.language, source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_analyzers_cover_all_languages() {
        let analyzers = default_analyzers();
        assert_eq!(analyzers.len(), supported_languages().count());
        assert!(analyzers.iter().all(|a| a.complexity_threshold == DEFAULT_COMPLEXITY_THRESHOLD));
    }

    #[test]
    fn test_dispatch_by_extension_and_exclusion() {
        let analyzer = ComplexityAnalyzer::new(&default_analyzers()).unwrap();
        assert_eq!(analyzer.analyzer_for(Path::new("src/app.ts")).unwrap().language, "typescript");
        assert_eq!(analyzer.analyzer_for(Path::new("lib/util.py")).unwrap().language, "python");
        assert!(analyzer.analyzer_for(Path::new("tests/test_util.py")).is_none());
        assert!(analyzer.analyzer_for(Path::new("src/app.test.ts")).is_none());
        assert!(analyzer.analyzer_for(Path::new("README.md")).is_none());
    }

    #[test]
    fn test_disabled_and_unknown_analyzers() {
        let mut defs = default_analyzers();
        for d in defs.iter_mut().filter(|d| d.language == "go") {
            d.enabled = false;
        }
        let analyzer = ComplexityAnalyzer::new(&defs).unwrap();
        assert!(analyzer.analyzer_for(Path::new("main.go")).is_none());

        let mut bogus = AnalyzerDefinition::builtin("rust").unwrap();
        bogus.language = "cobol".into();
        assert!(matches!(
            ComplexityAnalyzer::new(&[bogus]),
            Err(ConfigError::UnknownAnalyzer(lang)) if lang == "cobol"
        ));
    }

    #[test]
    fn test_empty_and_malformed_sources() {
        assert_eq!(analyze_source("python", "").unwrap(), vec![]);
        assert_eq!(analyze_source("rust", "\n\n").unwrap(), vec![]);
        assert!(analyze_source("javascript", "function f() {\n  if (a) {\n").is_err());
        assert!(analyze_source("fortran", "x").is_err());
    }
}
