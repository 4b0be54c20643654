//! Execution outcomes delivered to callers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::encoding::CapturedOutput;
use super::error::ExecError;

/// Why the queue itself terminated or cancelled an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillReason {
    /// The per-request deadline elapsed.
    Timeout,
    /// `kill_all` was called.
    ExplicitKill,
}

impl KillReason {
    /// Human-readable reason used in failure messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ExplicitKill => "explicit kill",
        }
    }
}

impl fmt::Display for KillReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful execution result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecOutput {
    /// Always `0`; any other exit code is reported as [`ExecError::AbnormalExit`].
    pub exit_code: i32,
    /// Captured standard output, present only when `store_stdout` was requested.
    pub stdout: Option<CapturedOutput>,
    /// Captured standard error, present only when `store_stderr` was requested.
    pub stderr: Option<CapturedOutput>,
}

impl ExecOutput {
    /// Captured standard output as text, if it was stored with a text encoding.
    #[must_use]
    pub fn stdout_text(&self) -> Option<&str> {
        self.stdout.as_ref().and_then(CapturedOutput::as_text)
    }

    /// Captured standard error as text, if it was stored with a text encoding.
    #[must_use]
    pub fn stderr_text(&self) -> Option<&str> {
        self.stderr.as_ref().and_then(CapturedOutput::as_text)
    }
}

/// Outcome shared by every caller attached to one execution.
pub type ExecResult = Result<ExecOutput, ExecError>;
