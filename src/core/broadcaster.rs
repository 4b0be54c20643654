//! Completion fan-out: one outcome delivered to every attached caller.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::error::ExecError;
use super::outcome::ExecResult;

/// Result sinks of every caller attached to one entry.
///
/// Fires at most once; the `fired` flag turns any later attempt into a no-op.
#[derive(Debug, Default)]
pub(crate) struct CompletionBroadcaster {
    sinks: Vec<oneshot::Sender<ExecResult>>,
    fired: bool,
}

impl CompletionBroadcaster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Attach one more caller and return its receiving end.
    pub(crate) fn attach(&mut self) -> oneshot::Receiver<ExecResult> {
        let (tx, rx) = oneshot::channel();
        self.sinks.push(tx);
        rx
    }

    /// Number of attached callers.
    pub(crate) fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver `outcome` to every attached caller.
    ///
    /// Returns how many callers were still listening.
    pub(crate) fn fire(&mut self, outcome: &ExecResult) -> usize {
        if self.fired {
            tracing::warn!("completion already fired, ignoring outcome");
            return 0;
        }
        self.fired = true;
        std::mem::take(&mut self.sinks)
            .into_iter()
            .map(|sink| sink.send(outcome.clone()))
            .filter(Result::is_ok)
            .count()
    }
}

/// Handle to the eventual outcome of a submitted request.
///
/// Resolves to the outcome shared by every caller attached to the same entry.
#[must_use = "a completion does nothing unless awaited"]
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<ExecResult>,
    entry_id: u64,
    joined: bool,
}

impl Completion {
    pub(crate) const fn new(rx: oneshot::Receiver<ExecResult>, entry_id: u64, joined: bool) -> Self {
        Self {
            rx,
            entry_id,
            joined,
        }
    }

    /// Identifier of the entry this caller is attached to.
    #[must_use]
    pub const fn entry_id(&self) -> u64 {
        self.entry_id
    }

    /// True when this caller joined an existing execution instead of creating one.
    #[must_use]
    pub const fn is_joined(&self) -> bool {
        self.joined
    }
}

impl Future for Completion {
    type Output = ExecResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ExecError::Abandoned)))
    }
}
