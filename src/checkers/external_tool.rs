//! Deadline-aware subprocess runner for checkers that wrap external tools
//!
//! Checkers such as dependency staleness shell out to a package manager.
//! The child runs with piped output drained on helper threads, and the
//! runner polls it against the attempt's `Deadline`. Once the deadline
//! passes (or the engine cancels the attempt) the child is killed and the
//! run reports `ExecutionError::Timeout`.

use crate::checkers::base::Deadline;
use crate::error::ExecutionError;
use serde_json::Value as JsonValue;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Output of a finished external tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code, `None` when killed by a signal
    pub return_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.return_code == Some(0)
    }

    /// Parse stdout as JSON
    pub fn json_output(&self) -> Option<JsonValue> {
        if self.stdout.trim().is_empty() {
            return None;
        }
        serde_json::from_str(&self.stdout).ok()
    }
}

/// Run `cmd` in `cwd` until it exits or `deadline` expires.
///
/// Launch failures (tool missing, permission denied) are transient so the
/// engine's retry policy applies to them.
pub fn run_tool(
    cmd: &[String],
    tool_name: &str,
    cwd: &Path,
    deadline: &Deadline,
) -> Result<ToolOutput, ExecutionError> {
    let Some((program, args)) = cmd.split_first() else {
        return Err(ExecutionError::terminal("empty command"));
    };
    deadline.check()?;

    debug!("Running {}: {} {:?}", tool_name, program, args);

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExecutionError::transient(format!("{} not found on PATH", tool_name))
            } else {
                ExecutionError::transient(format!("failed to launch {}: {}", tool_name, e))
            }
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok(ToolOutput {
                    stdout: collect(stdout),
                    stderr: collect(stderr),
                    return_code: status.code(),
                });
            }
            Ok(None) => {
                if deadline.is_expired() {
                    let _ = child.kill();
                    let _ = child.wait();
                    warn!("{} killed after {:?}", tool_name, deadline.budget());
                    return Err(ExecutionError::Timeout(deadline.budget()));
                }
                thread::sleep(POLL_INTERVAL.min(deadline.remaining().max(Duration::from_millis(1))));
            }
            Err(e) => {
                let _ = child.kill();
                return Err(ExecutionError::transient(format!(
                    "failed to wait for {}: {}",
                    tool_name, e
                )));
            }
        }
    }
}

/// Read a pipe to completion on a helper thread so the child never blocks
/// on a full pipe buffer
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<thread::JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<thread::JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[test]
    fn test_captures_output_and_code() {
        let deadline = Deadline::after(Duration::from_secs(10));
        let out = run_tool(&sh("echo '{\"a\": 1}'; echo err >&2; exit 3"), "sh", Path::new("."), &deadline)
            .unwrap();
        assert_eq!(out.return_code, Some(3));
        assert!(!out.success());
        assert_eq!(out.json_output().unwrap()["a"], 1);
        assert_eq!(out.stderr.trim(), "err");
    }

    #[test]
    fn test_kills_child_at_deadline() {
        let deadline = Deadline::after(Duration::from_millis(200));
        let start = Instant::now();
        let result = run_tool(&sh("sleep 5"), "sleep", Path::new("."), &deadline);
        assert!(matches!(result, Err(ExecutionError::Timeout(_))));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_cancel_stops_child() {
        let deadline = Deadline::after(Duration::from_secs(30));
        let handle = deadline.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            handle.cancel();
        });
        let start = Instant::now();
        let result = run_tool(&sh("sleep 5"), "sleep", Path::new("."), &deadline);
        assert!(matches!(result, Err(ExecutionError::Timeout(_))));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_missing_tool_is_transient() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let cmd = vec!["definitely-not-a-real-tool-xyz".to_string()];
        let err = run_tool(&cmd, "missing", Path::new("."), &deadline).unwrap_err();
        assert!(err.is_transient());
        assert!(!matches!(err, ExecutionError::Timeout(_)));
    }
}
