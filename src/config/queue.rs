//! Execution queue configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{ConfigError, KeyPolicy};

/// Environment variable holding the concurrency cap.
pub const ENV_MAX_CONCURRENT: &str = "EXEQUEUE_MAX_CONCURRENT";
/// Environment variable holding the shell path.
pub const ENV_SHELL: &str = "EXEQUEUE_SHELL";
/// Environment variable holding the key policy.
pub const ENV_KEY_POLICY: &str = "EXEQUEUE_KEY_POLICY";

/// Shell used when neither the configuration nor `$SHELL` names one.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Queue construction options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of concurrently running processes; `None` means unbounded.
    pub max_concurrent: Option<usize>,
    /// Interpreter for `use_shell` requests.
    pub shell: Option<PathBuf>,
    /// How request fingerprints are built.
    pub key_policy: KeyPolicy,
}

impl QueueConfig {
    /// Unbounded queue with the default shell and digest keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap sized to the number of logical CPUs.
    #[must_use]
    pub fn per_cpu() -> Self {
        Self::new().with_max_concurrent(num_cpus::get().max(1))
    }

    /// Set the concurrency cap.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = Some(max_concurrent);
        self
    }

    /// Set the shell used for `use_shell` requests.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    /// Set the key policy.
    #[must_use]
    pub const fn with_key_policy(mut self, key_policy: KeyPolicy) -> Self {
        self.key_policy = key_policy;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMaxConcurrent`] for a zero cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == Some(0) {
            return Err(ConfigError::InvalidMaxConcurrent(
                "max_concurrent must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Shell path: the configured one, else `$SHELL`, else `/bin/sh`. Empty
    /// values count as unset.
    #[must_use]
    pub fn resolve_shell(&self) -> PathBuf {
        if let Some(shell) = self.shell.as_ref().filter(|s| !s.as_os_str().is_empty()) {
            return shell.clone();
        }
        std::env::var_os("SHELL")
            .filter(|s| !s.is_empty())
            .map_or_else(|| Path::new(DEFAULT_SHELL).to_path_buf(), PathBuf::from)
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON, or the validation error.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read configuration from the process environment, loading `.env` first
    /// when present. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for values that do not parse or validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::new();
        if let Some(raw) = lookup(ENV_MAX_CONCURRENT).filter(|v| !v.trim().is_empty()) {
            let max = raw.trim().parse::<usize>().map_err(|e| {
                ConfigError::InvalidMaxConcurrent(format!("{ENV_MAX_CONCURRENT}={raw}: {e}"))
            })?;
            cfg.max_concurrent = Some(max);
        }
        if let Some(shell) = lookup(ENV_SHELL).filter(|v| !v.is_empty()) {
            cfg.shell = Some(PathBuf::from(shell));
        }
        if let Some(policy) = lookup(ENV_KEY_POLICY).filter(|v| !v.trim().is_empty()) {
            cfg.key_policy = policy.parse()?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
