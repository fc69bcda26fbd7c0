//! File permission checker
//!
//! Flags world-writable files and private keys readable by group or other.
//! Permission bits only exist on Unix; elsewhere the checker reports nothing.

use crate::checkers::base::{Checker, Deadline};
use crate::checkers::files::{build_globset, RepoFiles};
use crate::checkers::registry::CheckerDefinition;
use crate::error::{ConfigError, ExecutionError};
use crate::models::{Finding, Repository, Severity};

pub const CHECKER_ID: &str = "file-permissions";

/// File names and extensions that hold private key material
const KEY_FILE_NAMES: &[&str] = &["id_rsa", "id_dsa", "id_ecdsa", "id_ed25519"];
const KEY_EXTENSIONS: &[&str] = &["pem", "key", "p12", "pfx"];

fn is_private_key(path: &std::path::Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    KEY_FILE_NAMES.contains(&name) || KEY_EXTENSIONS.contains(&ext)
}

pub struct FilePermissionsChecker;

impl FilePermissionsChecker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FilePermissionsChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for FilePermissionsChecker {
    fn id(&self) -> &'static str {
        CHECKER_ID
    }

    fn description(&self) -> &'static str {
        "Flags world-writable files and exposed private keys"
    }

    fn default_definition(&self) -> CheckerDefinition {
        CheckerDefinition::new(CHECKER_ID, ["security"], Severity::High)
            .with_description(self.description())
            .with_exclusions(["**/node_modules/**"])
    }

    fn validate_options(&self, definition: &CheckerDefinition) -> Result<(), ConfigError> {
        build_globset(&definition.exclusions).map(|_| ())
    }

    #[cfg(unix)]
    fn run(
        &self,
        repository: &Repository,
        definition: &CheckerDefinition,
        deadline: &Deadline,
    ) -> Result<Vec<Finding>, ExecutionError> {
        use std::os::unix::fs::PermissionsExt;

        let exclusions =
            build_globset(&definition.exclusions).map_err(|e| ExecutionError::terminal(e.to_string()))?;
        let files = RepoFiles::collect(&repository.path, &exclusions, deadline)?;

        let mut findings = Vec::new();
        for path in files.files() {
            deadline.check()?;
            let Ok(meta) = std::fs::symlink_metadata(path) else {
                continue;
            };
            let mode = meta.permissions().mode();
            let relative = files.relative(path);

            if mode & 0o002 != 0 {
                findings.push(
                    Finding::new(
                        &definition.id,
                        definition.primary_category(),
                        definition.severity,
                        &repository.name,
                        format!("File is world-writable (mode {:o})", mode & 0o777),
                    )
                    .at(&relative, None),
                );
            } else if is_private_key(path) && mode & 0o077 != 0 {
                findings.push(
                    Finding::new(
                        &definition.id,
                        definition.primary_category(),
                        definition.severity,
                        &repository.name,
                        format!(
                            "Private key is accessible by group or others (mode {:o})",
                            mode & 0o777
                        ),
                    )
                    .at(&relative, None),
                );
            }
        }
        Ok(findings)
    }

    #[cfg(not(unix))]
    fn run(
        &self,
        _repository: &Repository,
        _definition: &CheckerDefinition,
        deadline: &Deadline,
    ) -> Result<Vec<Finding>, ExecutionError> {
        deadline.check()?;
        Ok(vec![])
    }
}
