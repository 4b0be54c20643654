//! Tokio runtime spawner implementation.

use std::future::Future;

use crate::core::{ConfigError, Spawn};

/// Tokio-based spawner that drives process watchers and timers on a runtime.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Create a spawner from a tokio runtime handle.
    #[must_use]
    pub const fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Create a spawner bound to the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Runtime`] when called outside a tokio runtime.
    pub fn current() -> Result<Self, ConfigError> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| ConfigError::Runtime(e.to_string()))
    }

    /// The underlying runtime handle.
    #[must_use]
    pub const fn handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }

    fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.handle.enter();
        f()
    }
}
