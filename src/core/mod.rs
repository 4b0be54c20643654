//! Core scheduling, fingerprinting and process execution.

pub mod broadcaster;
pub mod encoding;
pub mod error;
pub mod exec_queue;
pub mod fingerprint;
pub mod outcome;
pub mod request;
pub mod runner;
pub mod shell;
pub mod spawn;
pub mod timeout;

pub use broadcaster::Completion;
pub use encoding::{CapturedOutput, Encoding};
pub use error::{AppResult, ConfigError, ExecError};
pub use exec_queue::{ExecQueue, KillReport, QueueStats};
pub use fingerprint::{Fingerprint, KeyPolicy};
pub use outcome::{ExecOutput, ExecResult, KillReason};
pub use request::{CapturePlan, Descriptor, ExecRequest, Input, RunOptions};
pub use spawn::Spawn;
