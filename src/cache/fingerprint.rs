//! Repository content fingerprints
//!
//! A fingerprint changes whenever a checker could see something different:
//! any walked file added, removed, resized or touched, the git index
//! rewritten, or HEAD moved. File contents are not hashed; metadata is
//! enough to invalidate and keeps fingerprinting cheap on large trees.

use ignore::WalkBuilder;
use std::path::Path;
use std::time::UNIX_EPOCH;
use tracing::trace;
use xxhash_rust::xxh3::Xxh3;

fn mtime_nanos(metadata: &std::fs::Metadata) -> u128 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

/// Fingerprint of a repository's working tree and git state
pub fn repository_fingerprint(root: &Path) -> u64 {
    let mut hasher = Xxh3::new();
    hasher.update(root.to_string_lossy().as_bytes());

    let mut entries: Vec<(String, u64, u128)> = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .require_git(false)
        .filter_entry(|e| e.file_name() != ".git")
        .build()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
        .filter_map(|e| {
            let metadata = e.metadata().ok()?;
            let relative = e.path().strip_prefix(root).ok()?.to_string_lossy().into_owned();
            Some((relative, metadata.len(), mtime_nanos(&metadata)))
        })
        .collect();
    entries.sort();

    for (relative, len, mtime) in &entries {
        hasher.update(relative.as_bytes());
        hasher.update(&len.to_le_bytes());
        hasher.update(&mtime.to_le_bytes());
    }

    let index = root.join(".git").join("index");
    if let Ok(metadata) = std::fs::metadata(&index) {
        hasher.update(&metadata.len().to_le_bytes());
        hasher.update(&mtime_nanos(&metadata).to_le_bytes());
    }
    if let Ok(repo) = git2::Repository::open(root) {
        if let Some(oid) = repo.head().ok().and_then(|h| h.target()) {
            hasher.update(oid.as_bytes());
        }
    }

    let digest = hasher.digest();
    trace!("Fingerprint {:016x} for {} ({} files)", digest, root.display(), entries.len());
    digest
}
