//! Dev server registry - one shared file server per project
//!
//! The first request for a project spawns `<launcher> serve test --port <P>`
//! in the project root and watches its stdout for the ready marker. Every
//! request for the same project, concurrent or later, gets a signal tied to
//! that one start attempt. A failed start stays failed for the lifetime of
//! the registry; a ready server is never re-checked.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use drt_common::{Error, Result, ServerConfig};

use crate::process::{ProcessEvent, SpawnedProcess, StreamLine};

/// Readiness of one project's dev server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Starting,
    Ready,
    /// Start failed; carries the server log up to the failure
    Failed(String),
}

/// How dev server processes are launched
#[derive(Debug, Clone)]
pub struct DevServerLauncher {
    /// Path to the launcher binary
    pub binary: PathBuf,

    /// Port passed to `serve`
    pub port: u16,

    /// Substring of a stdout line that means the server is ready
    pub ready_marker: String,

    /// How long to wait after SIGTERM on shutdown
    pub terminate_grace: Duration,
}

impl DevServerLauncher {
    pub fn new(binary: impl Into<PathBuf>, config: &ServerConfig) -> Self {
        Self {
            binary: binary.into(),
            port: config.port,
            ready_marker: config.ready_marker.clone(),
            terminate_grace: Duration::from_secs(2),
        }
    }

    fn command(&self, project: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["serve", "test", "--port", &self.port.to_string()])
            .current_dir(project)
            .kill_on_drop(true);
        cmd
    }

    fn program(&self) -> String {
        self.binary.display().to_string()
    }
}

/// One project's server: its readiness and everything it printed
struct ServerEntry {
    state: watch::Sender<Readiness>,
    log: Mutex<String>,
}

impl ServerEntry {
    fn new() -> Self {
        let (state, _) = watch::channel(Readiness::Starting);
        Self {
            state,
            log: Mutex::new(String::new()),
        }
    }

    fn append(&self, line: &str) {
        let mut log = self.log.lock();
        log.push_str(line);
        log.push('\n');
    }

    fn log(&self) -> String {
        self.log.lock().clone()
    }

    fn mark_ready(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == Readiness::Starting {
                *state = Readiness::Ready;
                true
            } else {
                false
            }
        })
    }

    fn fail(&self) -> bool {
        let log = self.log();
        self.state.send_if_modified(move |state| {
            if *state == Readiness::Starting {
                *state = Readiness::Failed(log);
                true
            } else {
                false
            }
        })
    }
}

/// Awaitable readiness of one project's dev server. Cheap to clone;
/// every clone observes the same outcome.
#[derive(Clone)]
pub struct ReadinessSignal {
    project: PathBuf,
    rx: watch::Receiver<Readiness>,
}

impl ReadinessSignal {
    pub fn project(&self) -> &Path {
        &self.project
    }

    /// Current state without waiting
    pub fn current(&self) -> Readiness {
        self.rx.borrow().clone()
    }

    /// Wait until the server is ready or has failed to start
    pub async fn wait(mut self) -> Result<()> {
        let resolved = match self
            .rx
            .wait_for(|state| *state != Readiness::Starting)
            .await
        {
            Ok(state) => state.clone(),
            Err(_) => Readiness::Failed("dev server monitor stopped before readiness".to_string()),
        };

        match resolved {
            Readiness::Failed(log) => Err(Error::ServerStartupFailed {
                project: self.project,
                log,
            }),
            Readiness::Ready | Readiness::Starting => Ok(()),
        }
    }
}

/// Registry of dev servers keyed by project root
pub struct DevServerRegistry {
    launcher: DevServerLauncher,
    entries: Mutex<HashMap<PathBuf, Arc<ServerEntry>>>,
    monitors: Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl DevServerRegistry {
    pub fn new(launcher: DevServerLauncher) -> Self {
        Self {
            launcher,
            entries: Mutex::new(HashMap::new()),
            monitors: Mutex::new(Vec::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn launcher(&self) -> &DevServerLauncher {
        &self.launcher
    }

    /// Get the readiness signal for `project`, starting its server on first use.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn acquire(&self, project: &Path) -> ReadinessSignal {
        let key = registry_key(project);

        let entry = {
            let mut entries = self.entries.lock();
            if let Some(entry) = entries.get(&key) {
                debug!(project = %key.display(), "reusing dev server");
                return signal(&key, entry);
            }
            let entry = Arc::new(ServerEntry::new());
            entries.insert(key.clone(), entry.clone());
            entry
        };

        let readiness = signal(&key, &entry);
        self.start(key, entry);
        readiness
    }

    /// Log captured from the server of `project`, if one was requested
    pub fn server_log(&self, project: &Path) -> Option<String> {
        let key = registry_key(project);
        self.entries.lock().get(&key).map(|entry| entry.log())
    }

    /// Number of projects a server start was issued for
    pub fn server_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Stop every server this registry started and wait for them to exit
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let monitors: Vec<JoinHandle<()>> = std::mem::take(&mut *self.monitors.lock());
        for outcome in join_all(monitors).await {
            if let Err(e) = outcome {
                warn!("Dev server monitor panicked: {}", e);
            }
        }
    }

    fn start(&self, project: PathBuf, entry: Arc<ServerEntry>) {
        info!(
            project = %project.display(),
            port = self.launcher.port,
            "Starting dev server"
        );

        let command = self.launcher.command(&project);
        let process = match SpawnedProcess::spawn(command, &self.launcher.program()) {
            Ok(process) => process,
            Err(e) => {
                warn!(project = %project.display(), "Dev server failed to spawn: {}", e);
                entry.append(&e.to_string());
                entry.fail();
                return;
            }
        };

        let monitor = tokio::spawn(monitor(
            process,
            entry,
            project,
            self.launcher.ready_marker.clone(),
            self.launcher.terminate_grace,
            self.shutdown.clone(),
        ));
        self.monitors.lock().push(monitor);
    }
}

fn signal(project: &Path, entry: &ServerEntry) -> ReadinessSignal {
    ReadinessSignal {
        project: project.to_path_buf(),
        rx: entry.state.subscribe(),
    }
}

/// Canonical form of a project path so `app` and `./app` share a server.
/// Blocking, but a single metadata walk; `acquire` stays synchronous so the
/// entry is inserted before any await point.
fn registry_key(project: &Path) -> PathBuf {
    std::fs::canonicalize(project).unwrap_or_else(|_| project.to_path_buf())
}

async fn monitor(
    mut process: SpawnedProcess,
    entry: Arc<ServerEntry>,
    project: PathBuf,
    ready_marker: String,
    terminate_grace: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => {
                info!(project = %project.display(), "Stopping dev server");
                process.terminate(terminate_grace).await;
                entry.append("dev server stopped by registry shutdown");
                entry.fail();
                return;
            }
            event = process.next_event() => event,
        };

        match event {
            Ok(ProcessEvent::Line(StreamLine::Stdout(line))) => {
                entry.append(&line);
                if line.contains(&ready_marker) && entry.mark_ready() {
                    info!(project = %project.display(), "Dev server is ready");
                }
            }
            Ok(ProcessEvent::Line(StreamLine::Stderr(line))) => {
                entry.append(&line);
            }
            Ok(ProcessEvent::Exited(status)) => {
                if *entry.state.borrow() == Readiness::Ready {
                    warn!(project = %project.display(), ?status, "Dev server exited after becoming ready");
                } else {
                    warn!(project = %project.display(), ?status, "Dev server exited before becoming ready");
                }
            }
            Ok(ProcessEvent::Closed) => break,
            Err(e) => {
                warn!(project = %project.display(), "Lost track of dev server: {}", e);
                entry.append(&e.to_string());
                break;
            }
        }
    }

    if entry.fail() {
        debug!(project = %project.display(), "Dev server start marked failed");
    }
}
