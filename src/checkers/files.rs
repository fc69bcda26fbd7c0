//! Repository file listing shared by content-scanning checkers.
//!
//! Walks the repository once per checker invocation, honouring `.gitignore`
//! and the checker's exclusion globs, and checking the deadline as it goes
//! so a huge tree cannot hold a worker past its budget.

use crate::checkers::base::Deadline;
use crate::error::{ConfigError, ExecutionError};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Files above this size are never read for content checks
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Deadline is polled every this many walked entries
const DEADLINE_STRIDE: usize = 64;

/// Compile exclusion globs, reporting the first invalid one
pub fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ConfigError::InvalidPattern {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

/// Files of one repository, absolute paths in walk order
#[derive(Debug, Clone)]
pub struct RepoFiles {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl RepoFiles {
    /// Walk `root` in file-name order, dropping paths whose
    /// repository-relative form matches `exclusions`. Hidden files are
    /// included; `.git/` never is.
    pub fn collect(
        root: &Path,
        exclusions: &GlobSet,
        deadline: &Deadline,
    ) -> Result<Self, ExecutionError> {
        if !root.is_dir() {
            return Err(ExecutionError::terminal(format!(
                "repository path {} is not a directory",
                root.display()
            )));
        }

        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| entry.file_name() != ".git");

        let mut files = Vec::new();
        for (seen, entry) in builder.build().flatten().enumerate() {
            if seen % DEADLINE_STRIDE == 0 {
                deadline.check()?;
            }
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path);
            if exclusions.is_match(relative) {
                continue;
            }
            files.push(path.to_path_buf());
        }

        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    /// Build from an already-collected list
    pub fn new(root: impl Into<PathBuf>, files: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files whose extension is one of `exts` (without the leading dot)
    pub fn with_extensions<'a>(&'a self, exts: &'a [String]) -> impl Iterator<Item = &'a Path> {
        self.files
            .iter()
            .filter(move |p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| exts.iter().any(|x| x.trim_start_matches('.') == e))
                    .unwrap_or(false)
            })
            .map(|p| p.as_path())
    }

    /// Path relative to the repository root
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }

    /// Text content, or `None` for unreadable, oversized or binary files
    pub fn read(&self, path: &Path) -> Option<String> {
        let meta = std::fs::metadata(path).ok()?;
        if meta.len() > MAX_FILE_SIZE {
            return None;
        }
        std::fs::read_to_string(path).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_collect_skips_git_and_exclusions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/config"), "x").unwrap();
        std::fs::create_dir_all(dir.path().join("vendor")).unwrap();
        std::fs::write(dir.path().join("vendor/lib.js"), "x").unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        std::fs::write(dir.path().join(".env"), "A=1").unwrap();

        let exclusions = build_globset(&["vendor/**".to_string()]).unwrap();
        let deadline = Deadline::after(Duration::from_secs(10));
        let files = RepoFiles::collect(dir.path(), &exclusions, &deadline).unwrap();

        let mut rel: Vec<_> = files
            .files()
            .iter()
            .map(|p| files.relative(p).to_string_lossy().to_string())
            .collect();
        rel.sort();
        assert_eq!(rel, vec![".env", "main.rs"]);
    }

    #[test]
    fn test_collect_order_is_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta.py", "b/inner.py", "alpha.py", "a/deep/x.py"] {
            let path = dir.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "x").unwrap();
        }
        let deadline = Deadline::after(Duration::from_secs(10));
        let files = RepoFiles::collect(dir.path(), &GlobSet::empty(), &deadline).unwrap();

        let rel: Vec<_> = files
            .files()
            .iter()
            .map(|p| files.relative(p).to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["a/deep/x.py", "alpha.py", "b/inner.py", "zeta.py"]);
    }

    #[test]
    fn test_collect_respects_expired_deadline() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let deadline = Deadline::after(Duration::ZERO);
        let result = RepoFiles::collect(dir.path(), &GlobSet::empty(), &deadline);
        assert!(matches!(result, Err(ExecutionError::Timeout(_))));
    }

    #[test]
    fn test_missing_root_is_terminal() {
        let deadline = Deadline::after(Duration::from_secs(1));
        let result = RepoFiles::collect(Path::new("/no/such/repo"), &GlobSet::empty(), &deadline);
        assert!(matches!(result, Err(ExecutionError::Terminal(_))));
    }

    #[test]
    fn test_invalid_glob() {
        assert!(matches!(
            build_globset(&["[".to_string()]),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_with_extensions() {
        let files = RepoFiles::new(
            "/r",
            vec![PathBuf::from("/r/a.py"), PathBuf::from("/r/b.rs"), PathBuf::from("/r/c")],
        );
        let exts = vec![".py".to_string(), "rs".to_string()];
        assert_eq!(files.with_extensions(&exts).count(), 2);
    }
}
