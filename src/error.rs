//! Error taxonomy
//!
//! - `ConfigError` is fatal and surfaces before any checker runs.
//! - `ExecutionError` is per task; transient errors are retried, terminal
//!   ones and exhausted retries become findings.
//! - `ReportingError` fails one reporter invocation but never the collected
//!   findings.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("checker not found: {0}")]
    CheckerNotFound(String),

    #[error("unknown checker '{0}' in configuration")]
    UnknownChecker(String),

    #[error("unknown analyzer language '{0}' in configuration")]
    UnknownAnalyzer(String),

    #[error("unknown reporter '{0}' in configuration")]
    UnknownReporter(String),

    #[error("invalid option '{option}' for checker '{checker}': expected {expected}")]
    InvalidOption {
        checker: String,
        option: String,
        expected: String,
    },

    #[error("invalid severity '{0}' (expected critical, high, medium, low or info)")]
    InvalidSeverity(String),

    #[error("invalid duration '{0}' (expected seconds or a value like 500ms, 30s, 5m)")]
    InvalidDuration(String),

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Failure of a single (repository, checker) attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Launch failures, network-backed queries; eligible for retry
    #[error("{0}")]
    Transient(String),

    /// Malformed repository, unsupported language; never retried
    #[error("{0}")]
    Terminal(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ExecutionError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }

    /// Timeouts count as transient
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::Terminal(_) => "terminal",
            Self::Timeout(_) => "timeout",
        }
    }
}

#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("unsupported output format '{0}' (valid: table, json, yaml, xml, html, csv, flake8)")]
    UnsupportedFormat(String),

    #[error("failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write report: {0}")]
    Stream(#[from] std::io::Error),

    #[error("failed to serialize report: {0}")]
    Serialize(String),

    #[error("template error: {0}")]
    Template(String),
}

/// Run-level failure: only configuration and rendering errors surface here
#[derive(Error, Debug)]
pub enum HealthError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Reporting(#[from] ReportingError),

    #[error("failed to start worker pool: {0}")]
    Pool(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ExecutionError::transient("spawn failed").is_transient());
        assert!(ExecutionError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!ExecutionError::terminal("not a repository").is_transient());
    }

    #[test]
    fn test_error_messages() {
        let err = ConfigError::InvalidOption {
            checker: "git-status".into(),
            option: "max_untracked".into(),
            expected: "an unsigned integer".into(),
        };
        assert!(err.to_string().contains("max_untracked"));
        assert_eq!(
            ExecutionError::Timeout(Duration::from_secs(2)).to_string(),
            "timed out after 2s"
        );
    }
}
