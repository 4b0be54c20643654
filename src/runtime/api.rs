//! API-facing request/response models.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{
    AppResult, CapturedOutput, ConfigError, ExecQueue, ExecRequest, ExecResult, KillReason, QueueStats, Spawn,
};

/// Flat, serializable view of one execution outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecReport {
    /// Entry the caller was attached to.
    pub entry_id: u64,
    /// Whether the caller joined an existing execution.
    pub joined: bool,
    /// True for exit code 0.
    pub ok: bool,
    /// Exit code (`-1` for failures without a process exit, absent when signalled).
    pub exit_code: Option<i32>,
    /// Terminating signal name.
    pub signal: Option<String>,
    /// OS error number of a spawn failure.
    pub errno: Option<i32>,
    /// Why the queue killed or cancelled the execution.
    pub kill_reason: Option<KillReason>,
    /// Failure message.
    pub message: Option<String>,
    /// Captured standard output.
    pub stdout: Option<CapturedOutput>,
    /// Captured standard error.
    pub stderr: Option<CapturedOutput>,
}

impl ExecReport {
    /// Build a report from an outcome.
    #[must_use]
    pub fn from_result(entry_id: u64, joined: bool, result: &ExecResult) -> Self {
        match result {
            Ok(out) => Self {
                entry_id,
                joined,
                ok: true,
                exit_code: Some(out.exit_code),
                signal: None,
                errno: None,
                kill_reason: None,
                message: None,
                stdout: out.stdout.clone(),
                stderr: out.stderr.clone(),
            },
            Err(err) => Self {
                entry_id,
                joined,
                ok: false,
                exit_code: err.exit_code(),
                signal: err.signal().map(str::to_string),
                errno: err.errno(),
                kill_reason: err.kill_reason(),
                message: Some(err.to_string()),
                stdout: err.stdout().cloned(),
                stderr: err.stderr().cloned(),
            },
        }
    }
}

/// Health response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Running entries.
    pub running: usize,
    /// Waiting entries.
    pub waiting: usize,
}

/// Submit `request` and wait for its outcome as a report.
///
/// # Errors
///
/// Returns [`ConfigError`] when the request is rejected at submission.
pub async fn execute<S: Spawn>(
    queue: &ExecQueue<S>,
    request: ExecRequest,
) -> Result<ExecReport, ConfigError> {
    let completion = queue.submit(request)?;
    let (entry_id, joined) = (completion.entry_id(), completion.is_joined());
    let result = completion.await;
    Ok(ExecReport::from_result(entry_id, joined, &result))
}

/// Parse a JSON request, execute it and return the report.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed JSON, or the submission error.
pub async fn execute_json<S: Spawn>(
    queue: &ExecQueue<S>,
    body: &str,
) -> Result<ExecReport, ConfigError> {
    let request: ExecRequest =
        serde_json::from_str(body).map_err(|e| ConfigError::Parse(e.to_string()))?;
    execute(queue, request).await
}

/// Execute a JSON request and render its report as JSON.
///
/// # Errors
///
/// Fails when the request is rejected or the report cannot be serialized.
pub async fn execute_json_response<S: Spawn>(queue: &ExecQueue<S>, body: &str) -> AppResult<String> {
    let report = execute_json(queue, body)
        .await
        .context("request rejected")?;
    serde_json::to_string(&report).context("failed to serialize report")
}

/// Queue occupancy and counters.
#[must_use]
pub fn stats<S: Spawn>(queue: &ExecQueue<S>) -> QueueStats {
    queue.stats()
}

/// Return a health payload.
#[must_use]
pub fn health<S: Spawn>(queue: &ExecQueue<S>) -> Health {
    let stats = queue.stats();
    Health {
        ok: true,
        running: stats.running,
        waiting: stats.waiting,
    }
}
