//! Configuration models for the execution queue.

pub mod queue;

pub use queue::{QueueConfig, DEFAULT_SHELL, ENV_KEY_POLICY, ENV_MAX_CONCURRENT, ENV_SHELL};
