//! # Prometheus ExeQueue
//!
//! A bounded-concurrency execution queue for external processes that can share
//! identical in-flight executions between callers.
//!
//! Callers submit a process invocation (command, arguments, working directory,
//! environment, input and output-capture preferences). The queue either starts it
//! immediately, parks it in a FIFO waiting queue when the concurrency limit is
//! reached, or, for requests flagged as shared, attaches the caller to an identical
//! invocation that is already running or waiting and hands it the same result
//! without spawning a second process.
//!
//! ## Key Features
//!
//! - **Concurrency Cap**: At most `max_concurrent` processes run at once; the rest wait in submission order
//! - **Shared Executions**: Identical shared requests are fingerprinted and collapse into one process
//! - **Multicast Completion**: Every attached caller observes the same outcome and captured output
//! - **Timeouts**: Per-request deadlines cancel waiting work or signal running processes
//! - **Kill Switch**: `kill_all` cancels the waiting queue and signals every running process
//! - **Shell Wrapping**: Optional `sh -c` execution with automatic single-quote escaping
//!
//! ## Example
//!
//! ```rust,ignore
//! use prometheus_exequeue::config::QueueConfig;
//! use prometheus_exequeue::core::{ExecQueue, RunOptions};
//!
//! let queue = ExecQueue::new(QueueConfig::new().with_max_concurrent(4))?;
//!
//! // Two shared requests with identical descriptors run a single `sleep`.
//! let first = queue.run("sleep", ["1"], RunOptions::new().with_shared(true))?;
//! let second = queue.run("sleep", ["1"], RunOptions::new().with_shared(true))?;
//! let (a, b) = tokio::join!(first, second);
//! assert_eq!(a?.exit_code, 0);
//! assert_eq!(b?.exit_code, 0);
//!
//! // Captured output is decoded per the requested encoding.
//! let out = queue
//!     .run("echo", ["hello"], RunOptions::new().with_store_stdout(true))?
//!     .await?;
//! assert_eq!(out.stdout_text(), Some("hello\n"));
//! ```
//!
//! For complete examples, see:
//! - `tests/exec_queue_test.rs` - Admission, sharing and output capture
//! - `tests/timeout_kill_test.rs` - Timeouts and explicit kills

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling, fingerprinting and process execution.
pub mod core;
/// Configuration models for the execution queue.
pub mod config;
/// Builders to construct execution queues from configuration.
pub mod builders;
/// Runtime adapters and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::config::QueueConfig;
pub use crate::core::{
    Completion, ConfigError, Encoding, ExecError, ExecOutput, ExecQueue, ExecRequest, ExecResult,
    KillReason, RunOptions,
};
