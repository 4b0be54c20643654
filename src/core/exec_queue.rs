//! Execution queue: admission, sharing, completion and cancellation.
//!
//! The queue owns two registries keyed by [`Fingerprint`]: an insertion-ordered
//! waiting queue and the running registry. Both live behind a single
//! `parking_lot::Mutex` and every event (submission, process exit, spawn failure,
//! timer expiry, `kill_all`) applies its whole transition inside one critical
//! section without awaiting, so transitions never interleave.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::runtime::TokioSpawner;

use super::broadcaster::{Completion, CompletionBroadcaster};
use super::error::{ConfigError, ExecError};
use super::fingerprint::{Fingerprint, KeyPolicy};
use super::outcome::{ExecOutput, ExecResult, KillReason};
use super::request::{Descriptor, ExecRequest, RunOptions};
use super::runner::{self, ExitReport, ProcessHandle, Termination};
use super::spawn::Spawn;
use super::timeout::{self, TimeoutHandle};

/// Snapshot of queue occupancy and lifetime counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Configured concurrency cap (`None` = unbounded).
    pub max_concurrent: Option<usize>,
    /// Entries with a live process.
    pub running: usize,
    /// Entries waiting for capacity.
    pub waiting: usize,
    /// Total accepted submissions.
    pub submitted: u64,
    /// Submissions that joined an existing entry.
    pub joined: u64,
    /// Processes spawned.
    pub spawned: u64,
    /// Entries that finished with exit code 0.
    pub completed: u64,
    /// Entries that failed after (or while) spawning.
    pub failed: u64,
    /// Waiting entries cancelled before spawning.
    pub cancelled: u64,
}

/// What `kill_all` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KillReport {
    /// Waiting entries rejected without spawning.
    pub cancelled: usize,
    /// Running entries sent a termination signal.
    pub signalled: usize,
}

/// Lifetime counters (lock-free atomics).
#[derive(Debug, Default)]
struct QueueCounters {
    submitted: AtomicU64,
    joined: AtomicU64,
    spawned: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

/// One distinct execution, waiting or running.
#[derive(Debug)]
struct Entry {
    id: u64,
    key: Fingerprint,
    descriptor: Descriptor,
    /// Set once spawned, cleared when the exit is applied.
    process: Option<ProcessHandle>,
    kill_reason: Option<KillReason>,
    timeout: Option<TimeoutHandle>,
    completion: CompletionBroadcaster,
}

impl Entry {
    /// Turn the runner's report into the outcome shared by every caller.
    fn outcome(&self, report: ExitReport) -> ExecResult {
        let ExitReport {
            status,
            stdout,
            stderr,
        } = report;
        let status = status.map_err(|e| ExecError::spawn_failed(&e))?;

        let capture = self.descriptor.capture();
        let stdout = stdout.zip(capture.stdout).map(|(bytes, enc)| enc.decode(bytes));
        let stderr = stderr.zip(capture.stderr).map(|(bytes, enc)| enc.decode(bytes));

        match runner::classify(status) {
            Termination::Exited(0) => Ok(ExecOutput {
                exit_code: 0,
                stdout,
                stderr,
            }),
            Termination::Exited(exit_code) => Err(ExecError::AbnormalExit {
                exit_code,
                stdout,
                stderr,
            }),
            Termination::Signaled {
                name,
                is_kill_signal,
            } => Err(ExecError::Signaled {
                signal: name,
                kill_reason: self.kill_reason.filter(|_| is_kill_signal),
                stdout,
                stderr,
            }),
        }
    }
}

/// Registries and the entry id counter.
#[derive(Debug, Default)]
struct QueueState {
    next_id: u64,
    waiting: IndexMap<Fingerprint, Entry>,
    running: HashMap<Fingerprint, Entry>,
}

impl QueueState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

struct QueueInner<S> {
    max_concurrent: Option<usize>,
    shell: std::path::PathBuf,
    key_policy: KeyPolicy,
    state: Mutex<QueueState>,
    counters: QueueCounters,
    spawner: S,
}

/// Bounded-concurrency process execution queue with shared executions.
///
/// Cloning is cheap; clones share the same registries.
///
/// Dropping the last handle neither kills nor cancels anything: process watchers
/// keep the registries alive, so waiting entries are still promoted as running
/// ones exit. Pending deadlines of a dropped queue no longer fire.
pub struct ExecQueue<S = TokioSpawner>
where
    S: Spawn,
{
    inner: Arc<QueueInner<S>>,
}

impl<S: Spawn> Clone for ExecQueue<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ExecQueue<TokioSpawner> {
    /// Create a queue driven by the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid configuration or when called outside a
    /// tokio runtime.
    pub fn new(config: QueueConfig) -> Result<Self, ConfigError> {
        Self::with_spawner(config, TokioSpawner::current()?)
    }
}

impl<S: Spawn> ExecQueue<S> {
    /// Create a queue that drives processes and timers through `spawner`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn with_spawner(config: QueueConfig, spawner: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let shell = config.resolve_shell();
        info!(
            max_concurrent = ?config.max_concurrent,
            shell = %shell.display(),
            key_policy = ?config.key_policy,
            "ExecQueue initialized"
        );
        Ok(Self {
            inner: Arc::new(QueueInner {
                max_concurrent: config.max_concurrent,
                shell,
                key_policy: config.key_policy,
                state: Mutex::new(QueueState::default()),
                counters: QueueCounters::default(),
                spawner,
            }),
        })
    }

    /// Concurrency cap (`None` = unbounded).
    #[must_use]
    pub fn max_concurrent(&self) -> Option<usize> {
        self.inner.max_concurrent
    }

    /// Shell used for `use_shell` requests.
    #[must_use]
    pub fn shell(&self) -> &Path {
        &self.inner.shell
    }

    /// Submit `command` with `args`.
    ///
    /// # Errors
    ///
    /// See [`ExecQueue::submit`].
    pub fn run<I, A>(&self, command: &str, args: I, options: RunOptions) -> Result<Completion, ConfigError>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.submit(ExecRequest::new(command).with_args(args).with_options(options))
    }

    /// Submit a request.
    ///
    /// A shared request whose fingerprint matches a waiting or running entry is
    /// attached to that entry; no process is spawned and its own `max_time` is
    /// ignored. Otherwise a new entry is started immediately when capacity allows,
    /// or appended to the waiting queue.
    ///
    /// The returned [`Completion`] resolves once the entry reaches a terminal
    /// state, never within this call.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the request options are invalid; nothing is
    /// queued in that case.
    pub fn submit(&self, request: ExecRequest) -> Result<Completion, ConfigError> {
        let descriptor = request.normalize(&self.inner.shell)?;
        let inner = &self.inner;
        let mut state = inner.state.lock();

        // Non-shared requests fold their id into the key; shared ones hash the
        // descriptor alone and receive an id afterwards.
        let nonce = (!descriptor.is_shared()).then(|| state.allocate_id());
        let key = inner.key_policy.fingerprint(&descriptor, nonce)?;
        let id = match nonce {
            Some(id) => id,
            None => state.allocate_id(),
        };
        inner.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let QueueState {
            waiting, running, ..
        } = &mut *state;
        if let Some(existing) = running.get_mut(&key).or_else(|| waiting.get_mut(&key)) {
            let rx = existing.completion.attach();
            inner.counters.joined.fetch_add(1, Ordering::Relaxed);
            debug!(
                entry_id = existing.id,
                key = %key,
                attached = existing.completion.len(),
                "request joined existing execution"
            );
            return Ok(Completion::new(rx, existing.id, true));
        }

        let max_time = descriptor.max_time();
        let mut entry = Entry {
            id,
            key: key.clone(),
            descriptor,
            process: None,
            kill_reason: None,
            timeout: None,
            completion: CompletionBroadcaster::new(),
        };
        let rx = entry.completion.attach();

        if let Some(duration) = max_time {
            let weak: Weak<QueueInner<S>> = Arc::downgrade(inner);
            let timer_key = key.clone();
            entry.timeout = Some(timeout::arm(&inner.spawner, duration, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.expire(&timer_key, id);
                }
            }));
        }

        if inner.has_capacity(&state) {
            inner.admit(&mut state, entry);
        } else {
            state.waiting.insert(key, entry);
            debug!(
                entry_id = id,
                waiting = state.waiting.len(),
                "request queued"
            );
        }
        Ok(Completion::new(rx, id, false))
    }

    /// Cancel every waiting entry and signal every running process.
    ///
    /// Waiting callers are rejected immediately with a cancellation error.
    /// Running entries resolve through their normal exit path once the process
    /// has terminated.
    pub fn kill_all(&self) -> KillReport {
        let inner = &self.inner;
        let mut state = inner.state.lock();

        let waiting: Vec<Entry> = state.waiting.drain(..).map(|(_, entry)| entry).collect();
        let cancelled = waiting.len();
        for mut entry in waiting {
            entry.kill_reason = Some(KillReason::ExplicitKill);
            inner.settle(
                entry,
                &Err(ExecError::Cancelled {
                    reason: KillReason::ExplicitKill,
                }),
            );
        }

        let mut signalled = 0;
        for entry in state.running.values_mut() {
            entry.kill_reason = Some(KillReason::ExplicitKill);
            if entry.process.as_ref().is_some_and(ProcessHandle::terminate) {
                signalled += 1;
            }
        }

        warn!(cancelled, signalled, "kill_all issued");
        KillReport {
            cancelled,
            signalled,
        }
    }

    /// Current occupancy and lifetime counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let (running, waiting) = {
            let state = self.inner.state.lock();
            (state.running.len(), state.waiting.len())
        };
        let counters = &self.inner.counters;
        QueueStats {
            max_concurrent: self.inner.max_concurrent,
            running,
            waiting,
            submitted: counters.submitted.load(Ordering::Relaxed),
            joined: counters.joined.load(Ordering::Relaxed),
            spawned: counters.spawned.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            cancelled: counters.cancelled.load(Ordering::Relaxed),
        }
    }
}

impl<S: Spawn> QueueInner<S> {
    fn has_capacity(&self, state: &QueueState) -> bool {
        self.max_concurrent
            .is_none_or(|max| state.running.len() < max)
    }

    /// Spawn `entry` and register it as running.
    ///
    /// A spawn failure is terminal right away; the caller's promotion loop then
    /// moves on to the next waiting entry.
    fn admit(self: &Arc<Self>, state: &mut QueueState, mut entry: Entry) {
        let watcher = Arc::clone(self);
        let key = entry.key.clone();
        let id = entry.id;
        let launched = runner::launch(&self.spawner, &entry.descriptor, move |report| {
            watcher.finish(&key, id, report);
        });

        match launched {
            Ok(process) => {
                let pid = process.pid();
                entry.process = Some(process);
                self.counters.spawned.fetch_add(1, Ordering::Relaxed);
                info!(
                    entry_id = id,
                    pid,
                    command = entry.descriptor.command(),
                    running = state.running.len() + 1,
                    "process started"
                );
                state.running.insert(entry.key.clone(), entry);
            }
            Err(e) => {
                warn!(entry_id = id, command = entry.descriptor.command(), error = %e, "process spawn failed");
                self.settle(entry, &Err(ExecError::spawn_failed(&e)));
            }
        }
    }

    /// Apply a process exit reported by the runner.
    fn finish(self: &Arc<Self>, key: &Fingerprint, id: u64, report: ExitReport) {
        let mut state = self.state.lock();
        let tracked = state
            .running
            .get(key)
            .is_some_and(|entry| entry.id == id && entry.process.is_some());
        if !tracked {
            debug!(entry_id = id, "exit for untracked entry ignored");
            return;
        }
        let Some(mut entry) = state.running.remove(key) else {
            return;
        };
        let pid = entry.process.take().map(|process| process.pid());
        let outcome = entry.outcome(report);
        info!(
            entry_id = id,
            pid = ?pid,
            success = outcome.is_ok(),
            running = state.running.len(),
            waiting = state.waiting.len(),
            "process finished"
        );
        self.settle(entry, &outcome);
        self.promote(&mut state);
    }

    /// Admit waiting entries in FIFO order while capacity allows.
    fn promote(self: &Arc<Self>, state: &mut QueueState) {
        while self.has_capacity(state) {
            let Some((_, entry)) = state.waiting.shift_remove_index(0) else {
                break;
            };
            debug!(entry_id = entry.id, "promoting waiting entry");
            self.admit(state, entry);
        }
    }

    /// Handle deadline expiry of entry `id`.
    fn expire(self: &Arc<Self>, key: &Fingerprint, id: u64) {
        let mut state = self.state.lock();

        if let Some(entry) = state.running.get_mut(key).filter(|entry| entry.id == id) {
            entry.kill_reason = Some(KillReason::Timeout);
            entry.timeout = None;
            let pid = entry.process.as_ref().map(ProcessHandle::pid);
            warn!(entry_id = id, pid = ?pid, "max_time elapsed, terminating process");
            if let Some(process) = &entry.process {
                process.terminate();
            }
            return;
        }

        if state.waiting.get(key).is_some_and(|entry| entry.id == id) {
            if let Some(mut entry) = state.waiting.shift_remove(key) {
                entry.kill_reason = Some(KillReason::Timeout);
                warn!(entry_id = id, "max_time elapsed while waiting, cancelling");
                self.settle(
                    entry,
                    &Err(ExecError::Cancelled {
                        reason: KillReason::Timeout,
                    }),
                );
            }
        }
    }

    /// Fire the entry's completion and discard it.
    fn settle(&self, mut entry: Entry, outcome: &ExecResult) {
        entry.timeout = None;
        let counter = match outcome {
            Ok(_) => &self.counters.completed,
            Err(ExecError::Cancelled { .. }) => &self.counters.cancelled,
            Err(_) => &self.counters.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        let delivered = entry.completion.fire(outcome);
        debug!(entry_id = entry.id, delivered, "completion fired");
    }
}
