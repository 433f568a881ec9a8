//! Child process plumbing shared by the dev server and the browser runs
//!
//! Stdout and stderr are each read by a forwarding task into one channel.
//! Lines of a single stream arrive in the order the process wrote them;
//! there is no ordering between the two streams.

use std::io::ErrorKind;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use drt_common::{Error, Result};

/// A line read from one of the child's output streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamLine {
    Stdout(String),
    Stderr(String),
}

/// Next thing observed on a running child
#[derive(Debug)]
pub enum ProcessEvent {
    Line(StreamLine),
    Exited(ExitStatus),
    /// The child has exited and both streams reached end of file
    Closed,
}

/// Default time to keep reading buffered output after the child exits
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Handle to a spawned child with line-oriented output
pub struct SpawnedProcess {
    program: String,
    child: Child,
    pid: Option<u32>,
    lines: mpsc::UnboundedReceiver<StreamLine>,
    lines_open: bool,
    exit_status: Option<ExitStatus>,
    drain_grace: Duration,
    drain_deadline: Option<Instant>,
}

impl SpawnedProcess {
    /// Spawn `command` with piped stdout and stderr
    pub fn spawn(mut command: Command, program: &str) -> Result<Self> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|source| Error::Spawn {
            program: program.to_string(),
            source,
        })?;
        let pid = child.id();

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone(), StreamLine::Stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx, StreamLine::Stderr));
        }

        info!(program, pid, "process spawned");

        Ok(Self {
            program: program.to_string(),
            child,
            pid,
            lines: rx,
            lines_open: true,
            exit_status: None,
            drain_grace: DEFAULT_DRAIN_GRACE,
            drain_deadline: None,
        })
    }

    /// Bound how long output is still read once the child has exited.
    /// A grandchild holding the pipes open would otherwise keep them alive.
    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Wait for the next line or the exit of the child.
    ///
    /// Lines already forwarded are returned before the exit. After
    /// `Exited`, remaining buffered lines keep coming until `Closed`, which
    /// is reported at the latest once the drain grace has passed.
    pub async fn next_event(&mut self) -> Result<ProcessEvent> {
        loop {
            let drain_deadline = self.drain_deadline.unwrap_or_else(Instant::now);
            tokio::select! {
                biased;
                line = self.lines.recv(), if self.lines_open => match line {
                    Some(line) => return Ok(ProcessEvent::Line(line)),
                    None => self.lines_open = false,
                },
                status = self.child.wait(), if self.exit_status.is_none() => {
                    let status = status?;
                    self.exit_status = Some(status);
                    self.drain_deadline = Some(Instant::now() + self.drain_grace);
                    debug!(program = %self.program, ?status, "process exited");
                    return Ok(ProcessEvent::Exited(status));
                }
                _ = tokio::time::sleep_until(drain_deadline), if self.lines_open && self.drain_deadline.is_some() => {
                    warn!(program = %self.program, "output still open after exit, giving up on it");
                    self.lines_open = false;
                }
                else => return Ok(ProcessEvent::Closed),
            }
        }
    }

    /// Ask the child to stop: SIGTERM first, SIGKILL once `grace` has passed
    pub async fn terminate(&mut self, grace: Duration) {
        if self.exit_status.is_some() {
            return;
        }

        if !self.send_sigterm() {
            if let Err(e) = self.child.start_kill() {
                warn!(program = %self.program, "Failed to kill process: {}", e);
            }
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.exit_status = Some(status);
                self.drain_deadline = Some(Instant::now() + self.drain_grace);
            }
            Ok(Err(e)) => {
                warn!(program = %self.program, "Failed to reap process: {}", e);
            }
            Err(_) => {
                warn!(program = %self.program, pid = self.pid, "process ignored SIGTERM, killing");
                let _ = self.child.start_kill();
                if let Ok(status) = self.child.wait().await {
                    self.exit_status = Some(status);
                    self.drain_deadline = Some(Instant::now() + self.drain_grace);
                }
            }
        }
    }

    #[cfg(unix)]
    fn send_sigterm(&self) -> bool {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        match self.pid {
            Some(pid) => kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok(),
            None => false,
        }
    }

    #[cfg(not(unix))]
    fn send_sigterm(&self) -> bool {
        false
    }
}

async fn forward_lines<R>(
    reader: R,
    tx: mpsc::UnboundedSender<StreamLine>,
    wrap: fn(String) -> StreamLine,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(wrap(decode_line(&buf))).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Failed to read process output: {}", e);
                break;
            }
        }
    }
}

/// Page dumps carry arbitrary bytes; invalid UTF-8 is replaced, never fatal
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
