//! One (repository, checker) task and its state machine
//!
//! ```text
//! Pending -> CacheLookup -> CacheHit                      (done)
//!                        -> Executing -> Succeeded        (done)
//!                                     -> Retrying -> Executing
//!                                     -> Failed           (done, high finding)
//! ```
//!
//! Each attempt runs on its own thread so the task can stop waiting at the
//! deadline even when a checker ignores it; the deadline's cancellation
//! flag is raised and the late result is dropped with the channel.

use crate::cache::{cache_key, ResultCache};
use crate::checkers::{Checker, CheckerDefinition, Deadline};
use crate::engine::EngineSettings;
use crate::error::ExecutionError;
use crate::models::{Finding, Repository, Severity};
use crossbeam_channel::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

/// Where a task is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    CacheLookup,
    CacheHit,
    Executing,
    Retrying,
    Succeeded,
    Failed,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Pending => "pending",
            TaskState::CacheLookup => "cache_lookup",
            TaskState::CacheHit => "cache_hit",
            TaskState::Executing => "executing",
            TaskState::Retrying => "retrying",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything needed to run one checker against one repository
#[derive(Clone)]
pub struct Task {
    pub repository: Repository,
    pub definition: CheckerDefinition,
    pub checker: Arc<dyn Checker>,
    /// Repository fingerprint, present when caching is on
    pub fingerprint: Option<u64>,
}

impl Task {
    /// Definition and checker construction settings, as one cache key part
    pub fn settings_fingerprint(&self) -> u64 {
        let input = format!(
            "{:016x}\n{:016x}",
            self.definition.fingerprint(),
            self.checker.settings_fingerprint()
        );
        xxhash_rust::xxh3::xxh3_64(input.as_bytes())
    }
}

/// Final result of one task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub repository: String,
    pub checker: String,
    /// `CacheHit`, `Succeeded` or `Failed`
    pub state: TaskState,
    pub findings: Vec<Finding>,
    pub attempts: u32,
    /// Looked up in the cache without finding a fresh entry
    pub cache_miss: bool,
    /// Last error when the task failed
    pub error: Option<ExecutionError>,
    pub duration: Duration,
}

impl TaskOutcome {
    pub fn succeeded(&self) -> bool {
        self.state != TaskState::Failed
    }
}

fn transition(task: &Task, state: TaskState, attempt: u32) {
    trace!(
        repository = %task.repository.name,
        checker = %task.definition.id,
        attempt,
        "task -> {}",
        state
    );
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run a single attempt under the definition's timeout.
///
/// Returns `Timeout` once the deadline passes whether or not the checker
/// noticed; a result the checker produces afterwards is discarded.
pub fn run_attempt(task: &Task) -> Result<Vec<Finding>, ExecutionError> {
    let deadline = Deadline::after(task.definition.timeout);
    let (tx, rx) = crossbeam_channel::bounded(1);

    let checker = Arc::clone(&task.checker);
    let repository = task.repository.clone();
    let definition = task.definition.clone();
    let worker_deadline = deadline.clone();

    std::thread::Builder::new()
        .name(format!("check-{}", task.definition.id))
        .spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                checker.run(&repository, &definition, &worker_deadline)
            }));
            let result = match result {
                Ok(r) => r,
                Err(panic) => {
                    let msg = panic_message(panic);
                    error!("Checker {} panicked: {}", definition.id, msg);
                    Err(ExecutionError::terminal(format!("checker panicked: {}", msg)))
                }
            };
            // Receiver is gone once the attempt timed out
            let _ = tx.send(result);
        })
        .map_err(|e| ExecutionError::transient(format!("failed to spawn checker thread: {}", e)))?;

    match rx.recv_deadline(deadline.instant()) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            deadline.cancel();
            Err(ExecutionError::Timeout(deadline.budget()))
        }
        Err(RecvTimeoutError::Disconnected) => Err(ExecutionError::terminal(
            "checker thread exited without a result",
        )),
    }
}

/// The diagnostic finding recorded for a failed task
pub fn failure_finding(task: &Task, attempts: u32, error: &ExecutionError) -> Finding {
    Finding::new(
        &task.definition.id,
        task.definition.primary_category(),
        Severity::High,
        &task.repository.name,
        format!(
            "Checker '{}' failed after {} attempt(s) ({}): {}",
            task.definition.id,
            attempts,
            error.kind(),
            error
        ),
    )
}

/// Drive one task through its state machine
pub fn execute(task: &Task, cache: Option<&ResultCache>, settings: &EngineSettings) -> TaskOutcome {
    let start = Instant::now();
    transition(task, TaskState::Pending, 0);

    let key = match (cache, task.fingerprint) {
        (Some(_), Some(fp)) => Some(cache_key(fp, &task.definition.id, task.settings_fingerprint())),
        _ => None,
    };

    if let (Some(cache), Some(key)) = (cache, key.as_deref()) {
        transition(task, TaskState::CacheLookup, 0);
        if let Some(findings) = cache.get(key) {
            transition(task, TaskState::CacheHit, 0);
            return TaskOutcome {
                repository: task.repository.name.clone(),
                checker: task.definition.id.clone(),
                state: TaskState::CacheHit,
                findings,
                attempts: 0,
                cache_miss: false,
                error: None,
                duration: start.elapsed(),
            };
        }
    }

    let cache_miss = key.is_some();
    let max_attempts = settings.retry_attempts.saturating_add(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        transition(task, TaskState::Executing, attempt);

        match run_attempt(task) {
            Ok(findings) => {
                if let (Some(cache), Some(key)) = (cache, key.clone()) {
                    cache.insert(key, findings.clone());
                }
                transition(task, TaskState::Succeeded, attempt);
                debug!(
                    "{} on {}: {} findings in {:?}",
                    task.definition.id,
                    task.repository.name,
                    findings.len(),
                    start.elapsed()
                );
                return TaskOutcome {
                    repository: task.repository.name.clone(),
                    checker: task.definition.id.clone(),
                    state: TaskState::Succeeded,
                    findings,
                    attempts: attempt,
                    cache_miss,
                    error: None,
                    duration: start.elapsed(),
                };
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!(
                    "{} on {} failed ({}), retrying in {:?} (attempt {}/{})",
                    task.definition.id,
                    task.repository.name,
                    e,
                    settings.retry_delay,
                    attempt + 1,
                    max_attempts
                );
                transition(task, TaskState::Retrying, attempt);
                std::thread::sleep(settings.retry_delay);
            }
            Err(e) => {
                warn!(
                    "{} on {} failed after {} attempt(s): {}",
                    task.definition.id, task.repository.name, attempt, e
                );
                transition(task, TaskState::Failed, attempt);
                return TaskOutcome {
                    repository: task.repository.name.clone(),
                    checker: task.definition.id.clone(),
                    state: TaskState::Failed,
                    findings: vec![failure_finding(task, attempt, &e)],
                    attempts: attempt,
                    cache_miss,
                    error: Some(e),
                    duration: start.elapsed(),
                };
            }
        }
    }
}
