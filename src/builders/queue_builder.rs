//! Fluent construction of [`ExecQueue`] instances.

use std::path::PathBuf;

use crate::config::QueueConfig;
use crate::core::{ConfigError, ExecQueue, KeyPolicy, Spawn};
use crate::runtime::TokioSpawner;

/// Build a queue from `cfg` on the current tokio runtime.
///
/// # Errors
///
/// Returns [`ConfigError`] for invalid configuration or a missing runtime.
pub fn build_queue(cfg: &QueueConfig) -> Result<ExecQueue, ConfigError> {
    ExecQueueBuilder::from_config(cfg.clone()).build()
}

/// Builder for [`ExecQueue`].
#[derive(Debug, Clone, Default)]
pub struct ExecQueueBuilder {
    config: QueueConfig,
}

impl ExecQueueBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    #[must_use]
    pub const fn from_config(config: QueueConfig) -> Self {
        Self { config }
    }

    /// Start from the environment (see [`QueueConfig::from_env`]).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unparsable variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        QueueConfig::from_env().map(Self::from_config)
    }

    /// Limit concurrently running processes.
    #[must_use]
    pub const fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.config.max_concurrent = Some(max_concurrent);
        self
    }

    /// Remove the concurrency limit.
    #[must_use]
    pub const fn unbounded(mut self) -> Self {
        self.config.max_concurrent = None;
        self
    }

    /// Limit concurrency to the number of logical CPUs.
    #[must_use]
    pub fn per_cpu(mut self) -> Self {
        self.config.max_concurrent = QueueConfig::per_cpu().max_concurrent;
        self
    }

    /// Shell used for `use_shell` requests.
    #[must_use]
    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.config.shell = Some(shell.into());
        self
    }

    /// Fingerprint key policy.
    #[must_use]
    pub const fn key_policy(mut self, key_policy: KeyPolicy) -> Self {
        self.config.key_policy = key_policy;
        self
    }

    /// Configuration collected so far.
    #[must_use]
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Build on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid configuration or a missing runtime.
    pub fn build(self) -> Result<ExecQueue, ConfigError> {
        self.build_with_spawner(TokioSpawner::current()?)
    }

    /// Build with an explicit spawner.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid configuration.
    pub fn build_with_spawner<S: Spawn>(self, spawner: S) -> Result<ExecQueue<S>, ConfigError> {
        ExecQueue::with_spawner(self.config, spawner)
    }
}
