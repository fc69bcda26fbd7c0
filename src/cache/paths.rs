//! Cache path utilities - results live under ~/.cache/repos-health/<workspace-hash>/

use std::path::{Path, PathBuf};

/// Root cache directory for repos-health.
/// `~/.cache/repos-health` on Unix, `%LOCALAPPDATA%/repos-health` on Windows.
pub fn cache_root() -> PathBuf {
    let base = if cfg!(windows) {
        std::env::var("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")))
    } else {
        dirs::cache_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".cache"))
                .unwrap_or_else(|| PathBuf::from("."))
        })
    };
    base.join("repos-health")
}

/// Cache directory for runs started from `workspace`
pub fn cache_dir(workspace: &Path) -> PathBuf {
    cache_root().join(hash_path(workspace))
}

/// Default persistent result cache file for runs started from `workspace`
pub fn default_cache_file(workspace: &Path) -> PathBuf {
    cache_dir(workspace).join("results.json")
}

/// Unique but readable directory name for a path.
/// Uses the canonical path so `.` and its absolute form agree.
fn hash_path(path: &Path) -> String {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let hash = xxhash_rust::xxh3::xxh3_64(canonical.to_string_lossy().as_bytes());

    let name = canonical
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("workspace")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(20)
        .collect::<String>();

    format!("{}-{:012x}", name, hash & 0xffff_ffff_ffff)
}

/// Create the parent directory of a cache file
pub fn ensure_parent(file: &Path) -> std::io::Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_path_deterministic() {
        let path = Path::new("/tmp/health-workspace");
        assert_eq!(hash_path(path), hash_path(path));
        assert!(hash_path(path).starts_with("health-workspace-"));
    }

    #[test]
    fn test_default_cache_file_layout() {
        let file = default_cache_file(Path::new("/home/user/fleet"));
        assert!(file.to_string_lossy().contains("repos-health"));
        assert!(file.to_string_lossy().contains("fleet-"));
        assert!(file.ends_with("results.json"));
    }

    #[test]
    fn test_ensure_parent_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a/b/results.json");
        ensure_parent(&file).unwrap();
        assert!(dir.path().join("a/b").is_dir());
    }
}
