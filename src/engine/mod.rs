//! Scheduling engine
//!
//! Resolves the active checker set, fans (repository, checker) tasks out
//! over a bounded worker pool and aggregates the outcomes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     HealthEngine                        │
//! ├─────────────────────────────────────────────────────────┤
//! │  1. list_enabled(include, exclude) from the registry    │
//! │  2. Fingerprint repositories (cache keys)               │
//! │  3. Run tasks on a rayon pool of max_concurrency        │
//! │     (timeout, retry, cache per task)                    │
//! │  4. Collect outcomes over a channel                     │
//! │  5. aggregate() into a HealthReport                     │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod task;

pub use task::{Task, TaskOutcome, TaskState};

use crate::aggregate::aggregate;
use crate::cache::{repository_fingerprint, ResultCache};
use crate::checkers::{CheckerRegistry, DEFAULT_CHECKER_TIMEOUT};
use crate::error::HealthError;
use crate::models::{HealthReport, Repository, Severity};
use crate::reporters::OutputFormat;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Progress callback: (task label, completed, total)
pub type ProgressCallback = Arc<dyn Fn(&str, usize, usize) + Send + Sync>;

/// Engine policy resolved from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub max_concurrency: usize,
    pub timeout: Duration,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub cache_file: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            timeout: DEFAULT_CHECKER_TIMEOUT,
            cache_enabled: true,
            cache_ttl: Duration::from_secs(3600),
            retry_attempts: 2,
            retry_delay: Duration::from_secs(1),
            cache_file: None,
        }
    }
}

/// Per-run options supplied by the CLI layer
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub include_categories: Vec<String>,
    pub exclude_categories: Vec<String>,
    /// Findings below this severity are dropped before aggregation
    pub severity_threshold: Option<Severity>,
    pub output_format: OutputFormat,
    pub output_file: Option<PathBuf>,
    /// When false every task runs on a single worker
    pub parallel: bool,
    /// Overrides every checker's timeout
    pub timeout_seconds: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            include_categories: Vec::new(),
            exclude_categories: Vec::new(),
            severity_threshold: None,
            output_format: OutputFormat::Table,
            output_file: None,
            parallel: true,
            timeout_seconds: None,
        }
    }
}

/// Runs the enabled checkers over a set of repositories
pub struct HealthEngine {
    registry: Arc<CheckerRegistry>,
    cache: Option<Arc<ResultCache>>,
    settings: EngineSettings,
    progress: Option<ProgressCallback>,
}

impl HealthEngine {
    /// Engine with an in-memory cache when `settings.cache_enabled`,
    /// preloaded from `settings.cache_file` if one is configured
    pub fn new(registry: Arc<CheckerRegistry>, settings: EngineSettings) -> Self {
        let cache = settings.cache_enabled.then(|| {
            let cache = match &settings.cache_file {
                Some(path) => ResultCache::load(path, settings.cache_ttl).unwrap_or_else(|e| {
                    warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
                    ResultCache::new(settings.cache_ttl)
                }),
                None => ResultCache::new(settings.cache_ttl),
            };
            Arc::new(cache)
        });
        Self {
            registry,
            cache,
            settings,
            progress: None,
        }
    }

    /// Share an existing cache across engines
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn registry(&self) -> &CheckerRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn cache(&self) -> Option<&Arc<ResultCache>> {
        self.cache.as_ref()
    }

    /// Build the task list: every enabled checker for every repository
    fn plan(&self, repositories: &[Repository], options: &EngineOptions) -> Vec<Task> {
        let definitions = self
            .registry
            .list_enabled(&options.include_categories, &options.exclude_categories);

        let fingerprints: HashMap<&str, u64> = if self.cache.is_some() {
            repositories
                .par_iter()
                .map(|r| (r.name.as_str(), repository_fingerprint(&r.path)))
                .collect()
        } else {
            HashMap::new()
        };

        let mut tasks = Vec::with_capacity(repositories.len() * definitions.len());
        for repository in repositories {
            for definition in &definitions {
                let Ok(checker) = self.registry.checker(&definition.id) else {
                    warn!("No implementation registered for {}", definition.id);
                    continue;
                };
                let mut definition = (*definition).clone();
                if let Some(secs) = options.timeout_seconds {
                    definition.timeout = Duration::from_secs(secs);
                }
                tasks.push(Task {
                    repository: repository.clone(),
                    definition,
                    checker,
                    fingerprint: fingerprints.get(repository.name.as_str()).copied(),
                });
            }
        }
        tasks
    }

    /// Run every enabled checker on every repository.
    ///
    /// Checker failures never abort the run; they become high-severity
    /// findings. Only pool construction can fail here.
    pub fn run(
        &self,
        repositories: &[Repository],
        options: &EngineOptions,
    ) -> Result<HealthReport, HealthError> {
        let start = Instant::now();
        let tasks = self.plan(repositories, options);
        let total = tasks.len();
        let workers = if options.parallel {
            self.settings.max_concurrency.max(1)
        } else {
            1
        };
        info!(
            "Running {} tasks ({} repositories) on {} workers",
            total,
            repositories.len(),
            workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("health-worker-{}", i))
            .build()
            .map_err(|e| HealthError::Pool(e.to_string()))?;

        let (tx, rx) = crossbeam_channel::unbounded::<TaskOutcome>();
        let completed = AtomicUsize::new(0);
        let cache = self.cache.as_deref();

        pool.scope(|scope| {
            for task in &tasks {
                let tx = tx.clone();
                let completed = &completed;
                scope.spawn(move |_| {
                    let outcome = task::execute(task, cache, &self.settings);
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(progress) = &self.progress {
                        let label = format!("{}:{}", task.repository.name, task.definition.id);
                        progress(&label, done, total);
                    }
                    // Receiver outlives the scope
                    let _ = tx.send(outcome);
                });
            }
        });
        drop(tx);
        let outcomes: Vec<TaskOutcome> = rx.iter().collect();

        if let (Some(cache), Some(path)) = (&self.cache, &self.settings.cache_file) {
            if let Err(e) = cache.save(path) {
                warn!("Failed to save cache to {}: {}", path.display(), e);
            }
        }

        let mut report = aggregate(&outcomes, repositories, options.severity_threshold);
        report.metadata.duration_ms = start.elapsed().as_millis() as u64;
        if let Some(cache) = &self.cache {
            let stats = cache.stats();
            debug!("Cache: {} entries, {} hits, {} misses", stats.entries, stats.hits, stats.misses);
        }
        info!(
            "Run complete: {} findings from {} tasks ({} cached, {} missed, {} failed) in {:?}",
            report.total_findings(),
            report.metadata.tasks,
            report.metadata.cache_hits,
            report.metadata.cache_misses,
            report.metadata.failed_tasks,
            start.elapsed()
        );
        Ok(report)
    }
}
