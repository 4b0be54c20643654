//! Runtime abstraction used to drive process watchers and timers.

use std::future::Future;

/// Abstraction for spawning background work on a runtime.
pub trait Spawn: Send + Sync + 'static {
    /// Spawn an async task that runs to completion in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Run `f` inside the runtime context.
    ///
    /// Process spawning registers pipes with the runtime's I/O driver, so it must
    /// happen within the context even when called from a plain thread.
    fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }
}
