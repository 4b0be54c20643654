//! Error types for queue configuration and process execution.

use thiserror::Error;

use super::encoding::CapturedOutput;
use super::outcome::KillReason;

/// Errors raised synchronously while validating queue or request options.
///
/// A configuration error is returned before any process is involved and is
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `max_concurrent` was set but is not a positive integer.
    #[error("invalid max_concurrent: {0}")]
    InvalidMaxConcurrent(String),
    /// `max_time` is not a finite positive number of seconds.
    #[error("invalid max_time: {0}")]
    InvalidMaxTime(String),
    /// Working directory is missing or not absolute.
    #[error("invalid cwd: {0}")]
    InvalidCwd(String),
    /// `no_shell_escape` used without `use_shell`, or together with an argument list.
    #[error("conflicting use of no_shell_escape: requires use_shell and no separate arguments")]
    ConflictingNoShellEscape,
    /// Encoding name outside the supported set.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
    /// Input payload could not be converted to bytes.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Key policy name outside the supported set.
    #[error("unknown key policy: {0}")]
    UnknownKeyPolicy(String),
    /// Configuration source could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
    /// Request descriptor could not be serialized for fingerprinting.
    #[error("fingerprint error: {0}")]
    Fingerprint(String),
    /// No async runtime is available to drive processes and timers.
    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

/// Failure outcome of one execution, shared by every caller attached to it.
///
/// The display text is the human-readable message; the accessors expose the
/// structured details (`exit_code`, `signal`, `errno`, captured output).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    /// The executable could not be started (not found, permission denied, ...).
    #[error("Program execution failed.")]
    SpawnFailed {
        /// OS error number, when the failure came from the OS.
        errno: Option<i32>,
        /// Description of the underlying I/O failure.
        cause: String,
    },
    /// The process exited with a non-zero exit code.
    #[error("Program terminated by abnormal exit code.")]
    AbnormalExit {
        /// Exit code reported by the process.
        exit_code: i32,
        /// Captured standard output, if requested.
        stdout: Option<CapturedOutput>,
        /// Captured standard error, if requested.
        stderr: Option<CapturedOutput>,
    },
    /// The process was terminated by a signal.
    #[error("Program terminated by signal{}", signal_annotation(.kill_reason.as_ref()))]
    Signaled {
        /// Signal name, e.g. `SIGTERM`.
        signal: String,
        /// Why this queue sent the signal, if it did.
        kill_reason: Option<KillReason>,
        /// Captured standard output, if requested.
        stdout: Option<CapturedOutput>,
        /// Captured standard error, if requested.
        stderr: Option<CapturedOutput>,
    },
    /// A waiting execution was removed before a process was ever spawned.
    #[error("Program execution cancelled because of {reason}.")]
    Cancelled {
        /// Why the execution was cancelled.
        reason: KillReason,
    },
    /// The execution was discarded without an outcome, e.g. its runtime shut down.
    #[error("Program execution abandoned.")]
    Abandoned,
}

fn signal_annotation(kill_reason: Option<&KillReason>) -> String {
    kill_reason.map_or_else(|| ".".to_string(), |reason| format!(" because of {reason}."))
}

impl ExecError {
    /// Build a spawn failure from the I/O error returned by the OS.
    #[must_use]
    pub fn spawn_failed(error: &std::io::Error) -> Self {
        Self::SpawnFailed {
            errno: error.raw_os_error(),
            cause: error.to_string(),
        }
    }

    /// Exit code carried by this failure.
    ///
    /// `Some(-1)` for spawn failures, cancellations and abandonment, the process
    /// exit code for abnormal exits, and `None` when the process was signalled.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::AbnormalExit { exit_code, .. } => Some(*exit_code),
            Self::Signaled { .. } => None,
            Self::SpawnFailed { .. } | Self::Cancelled { .. } | Self::Abandoned => Some(-1),
        }
    }

    /// Name of the terminating signal, if any.
    #[must_use]
    pub fn signal(&self) -> Option<&str> {
        match self {
            Self::Signaled { signal, .. } => Some(signal),
            _ => None,
        }
    }

    /// OS error number for spawn failures.
    #[must_use]
    pub const fn errno(&self) -> Option<i32> {
        match self {
            Self::SpawnFailed { errno, .. } => *errno,
            _ => None,
        }
    }

    /// Why this queue killed or cancelled the execution, if it did.
    #[must_use]
    pub const fn kill_reason(&self) -> Option<KillReason> {
        match self {
            Self::Signaled { kill_reason, .. } => *kill_reason,
            Self::Cancelled { reason } => Some(*reason),
            _ => None,
        }
    }

    /// Captured standard output. Always `None` for executions that never ran.
    #[must_use]
    pub const fn stdout(&self) -> Option<&CapturedOutput> {
        match self {
            Self::AbnormalExit { stdout, .. } | Self::Signaled { stdout, .. } => stdout.as_ref(),
            _ => None,
        }
    }

    /// Captured standard error. Always `None` for executions that never ran.
    #[must_use]
    pub const fn stderr(&self) -> Option<&CapturedOutput> {
        match self {
            Self::AbnormalExit { stderr, .. } | Self::Signaled { stderr, .. } => stderr.as_ref(),
            _ => None,
        }
    }

    /// True when the execution was cancelled before it was spawned.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
