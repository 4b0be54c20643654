//! Process runner: spawn, stream capture, exit classification and signalling.
//!
//! One launch owns one child process. Captured streams are read to the end into
//! private buffers while the input payload is written and standard input closed;
//! once the process has exited the buffers and exit status are handed back in a
//! single [`ExitReport`]. Termination requests go through the task that holds
//! the child.

use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::request::Descriptor;
use super::spawn::Spawn;

/// Signal sent by the queue to terminate a process it owns.
pub const KILL_SIGNAL: Signal = Signal::SIGTERM;

const READ_CHUNK: usize = 8 * 1024;

/// Everything a finished process reports back.
#[derive(Debug)]
pub(crate) struct ExitReport {
    /// Exit status, or the error raised while waiting for it.
    pub status: io::Result<ExitStatus>,
    /// Standard output bytes when captured.
    pub stdout: Option<Vec<u8>>,
    /// Standard error bytes when captured.
    pub stderr: Option<Vec<u8>>,
}

/// How a process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Termination {
    /// Normal exit with a code.
    Exited(i32),
    /// Killed by a signal.
    Signaled {
        /// Signal name, e.g. `SIGTERM`.
        name: String,
        /// Whether it is the signal this queue uses for kills.
        is_kill_signal: bool,
    },
}

/// Live process owned by a watcher task.
///
/// Termination requests are forwarded to the watcher, which signals the child
/// only while it still holds it unreaped, so a recycled pid is never hit.
#[derive(Debug)]
pub(crate) struct ProcessHandle {
    pid: u32,
    kill_tx: mpsc::UnboundedSender<()>,
}

impl ProcessHandle {
    pub(crate) const fn pid(&self) -> u32 {
        self.pid
    }

    /// Ask the watcher to send [`KILL_SIGNAL`].
    ///
    /// Returns `false` once the watcher has finished with the process.
    pub(crate) fn terminate(&self) -> bool {
        self.kill_tx.send(()).is_ok()
    }
}

/// Spawn the process described by `descriptor` and watch it in the background.
///
/// `on_exit` runs exactly once, after both captured streams reached end-of-file
/// and the process was reaped.
///
/// # Errors
///
/// Returns the spawn error when the executable cannot be started.
pub(crate) fn launch<S, F>(spawner: &S, descriptor: &Descriptor, on_exit: F) -> io::Result<ProcessHandle>
where
    S: Spawn,
    F: FnOnce(ExitReport) + Send + 'static,
{
    let capture = descriptor.capture();
    let mut command = Command::new(descriptor.command());
    command
        .args(descriptor.args())
        .current_dir(descriptor.cwd())
        .env_clear()
        .envs(descriptor.env())
        .stdin(Stdio::piped())
        .stdout(if capture.stdout.is_some() { Stdio::piped() } else { Stdio::null() })
        .stderr(if capture.stderr.is_some() { Stdio::piped() } else { Stdio::null() });

    let mut child = spawner.enter(|| command.spawn())?;
    let pid = child
        .id()
        .ok_or_else(|| io::Error::other("spawned process has no pid"))?;

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let input = descriptor.input().to_vec();
    let (kill_tx, mut kill_rx) = mpsc::unbounded_channel::<()>();

    spawner.spawn(async move {
        let feed = async move {
            let Some(mut stdin) = stdin else { return };
            if !input.is_empty() {
                // The process may exit without reading its input.
                if let Err(e) = stdin.write_all(&input).await {
                    debug!(pid, error = %e, "stdin write interrupted");
                }
            }
            // Dropping the handle closes standard input.
        };
        let streams = async { tokio::join!(feed, read_stream(pid, stdout), read_stream(pid, stderr)) };
        let exit = async {
            loop {
                tokio::select! {
                    status = child.wait() => break status,
                    Some(()) = kill_rx.recv() => signal_child(&child),
                }
            }
        };
        let (((), stdout, stderr), status) = tokio::join!(streams, exit);
        drop(kill_rx);
        on_exit(ExitReport {
            status,
            stdout,
            stderr,
        });
    });

    Ok(ProcessHandle { pid, kill_tx })
}

async fn read_stream<R>(pid: u32, stream: Option<R>) -> Option<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut stream = stream?;
    let mut buffer = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                warn!(pid, error = %e, "output stream read failed");
                break;
            }
        }
    }
    Some(buffer)
}

/// Send [`KILL_SIGNAL`] to a child that has not been reaped yet.
///
/// Failures are logged and otherwise ignored; the exit path reports the final
/// outcome either way.
fn signal_child(child: &Child) {
    let Some(pid) = child.id() else {
        debug!("process already reaped, not signalled");
        return;
    };
    let Ok(raw) = i32::try_from(pid) else {
        warn!(pid, "pid out of range, not signalled");
        return;
    };
    match signal::kill(Pid::from_raw(raw), KILL_SIGNAL) {
        Ok(()) => debug!(pid, signal = KILL_SIGNAL.as_str(), "termination signal sent"),
        Err(e) => warn!(pid, error = %e, "failed to signal process"),
    }
}

/// Classify an exit status.
pub(crate) fn classify(status: ExitStatus) -> Termination {
    if let Some(code) = status.code() {
        return Termination::Exited(code);
    }
    let raw = status.signal().unwrap_or_default();
    match Signal::try_from(raw) {
        Ok(sig) => Termination::Signaled {
            name: sig.as_str().to_string(),
            is_kill_signal: sig == KILL_SIGNAL,
        },
        Err(_) => Termination::Signaled {
            name: format!("SIG{raw}"),
            is_kill_signal: false,
        },
    }
}
