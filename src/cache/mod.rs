//! Result cache for checker runs
//!
//! Maps (repository fingerprint, checker id, definition fingerprint) to the
//! findings a successful run produced. Entries expire after a TTL and are
//! never returned once stale. The cache is an explicitly constructed object
//! shared behind an `Arc`; DashMap makes per-key reads and writes atomic
//! (last writer wins).
//!
//! The in-memory cache can be persisted as JSON between runs; expired
//! entries are pruned on load.

pub mod fingerprint;
pub mod paths;

pub use fingerprint::repository_fingerprint;
pub use paths::{cache_dir, default_cache_file};

use crate::models::Finding;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Bump when the on-disk layout changes
const CACHE_VERSION: u32 = 1;

/// Cache key for one (repository state, checker, definition) combination
pub fn cache_key(repository_fingerprint: u64, checker_id: &str, definition_fingerprint: u64) -> String {
    let input = format!("{repository_fingerprint:016x}\n{checker_id}\n{definition_fingerprint:016x}");
    format!("{:016x}", xxhash_rust::xxh3::xxh3_64(input.as_bytes()))
}

/// Cached findings plus insertion time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub findings: Vec<Finding>,
    pub inserted_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.inserted_at) < ttl,
            // TTL beyond chrono's range never expires
            Err(_) => true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

/// Thread-safe TTL cache of checker results
#[derive(Debug)]
pub struct ResultCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    hits: AtomicUsize,
    misses: AtomicUsize,
    dirty: AtomicBool,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh findings for `key`, if any
    pub fn get(&self, key: &str) -> Option<Vec<Finding>> {
        self.get_at(key, Utc::now())
    }

    /// Lookup as of `now`; stale entries are evicted and count as misses
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Vec<Finding>> {
        let fresh = self
            .entries
            .get(key)
            .map(|entry| entry.is_fresh(self.ttl, now).then(|| entry.findings.clone()));
        match fresh {
            Some(Some(findings)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {}", key);
                Some(findings)
            }
            Some(None) => {
                self.entries.remove(key);
                self.dirty.store(true, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache entry {} expired", key);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for {}", key);
                None
            }
        }
    }

    pub fn insert(&self, key: impl Into<String>, findings: Vec<Finding>) {
        self.insert_at(key, findings, Utc::now());
    }

    pub fn insert_at(&self, key: impl Into<String>, findings: Vec<Finding>, now: DateTime<Utc>) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                findings,
                inserted_at: now,
            },
        );
        self.dirty.store(true, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        self.entries.clear();
        self.dirty.store(true, Ordering::Relaxed);
    }

    /// Remove entries stale as of `now`; returns how many were removed
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(self.ttl, now));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.dirty.store(true, Ordering::Relaxed);
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Load a persisted cache; a missing file or older layout yields an
    /// empty cache
    pub fn load(path: &Path, ttl: Duration) -> std::io::Result<Self> {
        let cache = Self::new(ttl);
        if !path.exists() {
            debug!("No cache file at {}", path.display());
            return Ok(cache);
        }
        let reader = BufReader::new(File::open(path)?);
        let data: CacheFile = serde_json::from_reader(reader)?;
        if data.version != CACHE_VERSION {
            info!(
                "Cache version mismatch (got {}, expected {}), starting empty",
                data.version, CACHE_VERSION
            );
            return Ok(cache);
        }
        for (key, entry) in data.entries {
            cache.entries.insert(key, entry);
        }
        let pruned = cache.prune_expired(Utc::now());
        cache.dirty.store(false, Ordering::Relaxed);
        debug!(
            "Loaded {} cache entries from {} ({} expired)",
            cache.len(),
            path.display(),
            pruned
        );
        Ok(cache)
    }

    /// Persist fresh entries as JSON; a no-op when nothing changed
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if !self.dirty.load(Ordering::Relaxed) && path.exists() {
            return Ok(());
        }
        self.prune_expired(Utc::now());
        paths::ensure_parent(path)?;

        let data = CacheFile {
            version: CACHE_VERSION,
            entries: self
                .entries
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        };

        // Write to a temp file first, then rename (atomic on POSIX)
        let tmp = path.with_extension("tmp");
        let writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(writer, &data)?;
        fs::rename(&tmp, path)?;

        self.dirty.store(false, Ordering::Relaxed);
        debug!("Saved {} cache entries to {}", data.entries.len(), path.display());
        Ok(())
    }
}
