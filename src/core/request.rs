//! Request descriptors: caller options and their normalized form.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::encoding::Encoding;
use super::error::ConfigError;
use super::shell;
use super::timeout;

/// Data written to the process's standard input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Input {
    /// Raw bytes, written as-is.
    Bytes(Vec<u8>),
    /// Text converted with [`RunOptions::input_encoding`].
    Text(String),
}

/// Per-request options.
///
/// All fields are optional; defaults mirror an unshared, uncaptured run in the
/// current working directory with the inherited environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Maximum run time in seconds, clamped up to one millisecond.
    pub max_time: Option<f64>,
    /// Allow this request to share an identical in-flight execution.
    pub shared: bool,
    /// Run through the configured shell.
    pub use_shell: bool,
    /// Pass the command string to the shell without quoting.
    pub no_shell_escape: bool,
    /// Absolute working directory; defaults to the current directory.
    pub cwd: Option<PathBuf>,
    /// Full environment; defaults to the inherited process environment, minus
    /// variables whose name or value is not valid UTF-8.
    pub env: Option<BTreeMap<String, String>>,
    /// Standard input payload.
    pub input: Option<Input>,
    /// Encoding applied to text input.
    pub input_encoding: Encoding,
    /// Capture standard output.
    pub store_stdout: bool,
    /// Capture standard error.
    pub store_stderr: bool,
    /// Encoding of captured standard output.
    pub stdout_encoding: Encoding,
    /// Encoding of captured standard error.
    pub stderr_encoding: Encoding,
}

impl RunOptions {
    /// Options with every default applied.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum run time in seconds.
    #[must_use]
    pub const fn with_max_time_secs(mut self, secs: f64) -> Self {
        self.max_time = Some(secs);
        self
    }

    /// Set the maximum run time.
    #[must_use]
    pub const fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time.as_secs_f64());
        self
    }

    /// Mark the request as shareable.
    #[must_use]
    pub const fn with_shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    /// Run through the configured shell.
    #[must_use]
    pub const fn with_use_shell(mut self, use_shell: bool) -> Self {
        self.use_shell = use_shell;
        self
    }

    /// Hand the command string to the shell verbatim.
    #[must_use]
    pub const fn with_no_shell_escape(mut self, no_shell_escape: bool) -> Self {
        self.no_shell_escape = no_shell_escape;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Replace the environment.
    #[must_use]
    pub fn with_env<K, V>(mut self, env: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(env.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Feed raw bytes to standard input.
    #[must_use]
    pub fn with_input_bytes(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(Input::Bytes(input.into()));
        self
    }

    /// Feed text to standard input, converted with `encoding`.
    #[must_use]
    pub fn with_input_text(mut self, input: impl Into<String>, encoding: Encoding) -> Self {
        self.input = Some(Input::Text(input.into()));
        self.input_encoding = encoding;
        self
    }

    /// Capture standard output.
    #[must_use]
    pub const fn with_store_stdout(mut self, store: bool) -> Self {
        self.store_stdout = store;
        self
    }

    /// Capture standard error.
    #[must_use]
    pub const fn with_store_stderr(mut self, store: bool) -> Self {
        self.store_stderr = store;
        self
    }

    /// Encoding of captured standard output.
    #[must_use]
    pub const fn with_stdout_encoding(mut self, encoding: Encoding) -> Self {
        self.stdout_encoding = encoding;
        self
    }

    /// Encoding of captured standard error.
    #[must_use]
    pub const fn with_stderr_encoding(mut self, encoding: Encoding) -> Self {
        self.stderr_encoding = encoding;
        self
    }
}

/// A process invocation as submitted by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecRequest {
    /// Program name or path (or the script, with `no_shell_escape`).
    pub command: String,
    /// Ordered argument list.
    #[serde(default)]
    pub args: Vec<String>,
    /// Per-request options.
    #[serde(default)]
    pub options: RunOptions,
}

impl ExecRequest {
    /// Request for `command` with no arguments and default options.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            options: RunOptions::default(),
        }
    }

    /// Set the argument list.
    #[must_use]
    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the options.
    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate options, apply defaults and shell wrapping.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for conflicting shell flags, a bad `max_time`, a
    /// relative or unknown working directory, or input that cannot be encoded.
    pub fn normalize(self, shell: &Path) -> Result<Descriptor, ConfigError> {
        let Self {
            command,
            args,
            options,
        } = self;

        if options.no_shell_escape && (!options.use_shell || !args.is_empty()) {
            return Err(ConfigError::ConflictingNoShellEscape);
        }

        let max_time = options.max_time.map(timeout::clamp_max_time).transpose()?;

        let cwd = match options.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir().map_err(|e| ConfigError::InvalidCwd(e.to_string()))?,
        };
        if !cwd.is_absolute() {
            return Err(ConfigError::InvalidCwd(format!(
                "{} is not an absolute path",
                cwd.display()
            )));
        }

        let env = options.env.unwrap_or_else(inherited_env);

        let input = match options.input {
            None => Vec::new(),
            Some(Input::Bytes(bytes)) => bytes,
            Some(Input::Text(text)) => options.input_encoding.encode(&text)?,
        };

        let (command, args) = if options.use_shell {
            shell::wrap(shell, &command, &args, !options.no_shell_escape)
        } else {
            (command, args)
        };

        Ok(Descriptor {
            command,
            args,
            cwd,
            env,
            input,
            capture: CapturePlan {
                stdout: options.store_stdout.then_some(options.stdout_encoding),
                stderr: options.store_stderr.then_some(options.stderr_encoding),
            },
            shared: options.shared,
            max_time,
        })
    }
}

fn inherited_env() -> BTreeMap<String, String> {
    utf8_env(std::env::vars_os())
}

/// Keep the UTF-8 variables of `vars`, logging the rest.
fn utf8_env(vars: impl Iterator<Item = (OsString, OsString)>) -> BTreeMap<String, String> {
    vars.filter_map(|(k, v)| match (k.into_string(), v.into_string()) {
        (Ok(k), Ok(v)) => Some((k, v)),
        (k, _) => {
            let name = k.unwrap_or_else(|raw| raw.to_string_lossy().into_owned());
            tracing::debug!(name = %name, "skipping non UTF-8 environment variable");
            None
        }
    })
    .collect()
}

/// Which streams to capture and how to decode them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapturePlan {
    /// Standard output encoding, or `None` to discard it.
    pub stdout: Option<Encoding>,
    /// Standard error encoding, or `None` to discard it.
    pub stderr: Option<Encoding>,
}

/// Normalized, immutable request descriptor.
///
/// `command` and `args` are the values actually executed, after shell wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub(crate) command: String,
    pub(crate) args: Vec<String>,
    pub(crate) cwd: PathBuf,
    pub(crate) env: BTreeMap<String, String>,
    pub(crate) input: Vec<u8>,
    pub(crate) capture: CapturePlan,
    pub(crate) shared: bool,
    pub(crate) max_time: Option<Duration>,
}

impl Descriptor {
    /// Program to execute.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Working directory.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Complete environment of the process.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Bytes written to standard input.
    #[must_use]
    pub fn input(&self) -> &[u8] {
        &self.input
    }

    /// Capture preferences.
    #[must_use]
    pub const fn capture(&self) -> CapturePlan {
        self.capture
    }

    /// Whether the request may share an execution.
    #[must_use]
    pub const fn is_shared(&self) -> bool {
        self.shared
    }

    /// Clamped maximum run time.
    #[must_use]
    pub const fn max_time(&self) -> Option<Duration> {
        self.max_time
    }
}
