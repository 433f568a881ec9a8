//! Test execution: setup, browser run, single completion
//!
//! A run is `Setup` (harness page, bootstrap script and dev server readiness,
//! all awaited together) then `Running` (browser spawned, output classified)
//! then `Completed`. A setup failure is returned as an error and nothing is
//! spawned. Once the browser is running, every path ends in exactly one
//! [`TestExecutionResult`].

use std::future::pending;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::process::Command;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use drt_common::{DrtConfig, Outcome, Result, TestDescriptor, TestExecutionResult};

use crate::accumulator::RunAccumulator;
use crate::binaries::BinaryLocator;
use crate::harness::{FileHarnessGenerator, HarnessGenerator};
use crate::process::{ProcessEvent, SpawnedProcess, StreamLine};
use crate::server::{DevServerLauncher, DevServerRegistry};

/// Flags that put the rendering engine in headless dump-render-tree mode
pub const BROWSER_FLAGS: &[&str] = &["--args", "--dump-render-tree", "--disable-gpu"];

/// Runs single browser tests against a shared dev server registry
pub struct TestExecutor {
    config: DrtConfig,
    browser: PathBuf,
    registry: Arc<DevServerRegistry>,
    generator: Arc<dyn HarnessGenerator>,
}

impl TestExecutor {
    pub fn new(
        config: DrtConfig,
        browser: impl Into<PathBuf>,
        registry: Arc<DevServerRegistry>,
        generator: Arc<dyn HarnessGenerator>,
    ) -> Self {
        Self {
            config,
            browser: browser.into(),
            registry,
            generator,
        }
    }

    /// Build an executor with file-based harness generation and a fresh registry
    pub fn from_config(config: DrtConfig, locator: &dyn BinaryLocator) -> Result<Self> {
        config.validate()?;
        let browser = locator.browser()?;

        let mut launcher = DevServerLauncher::new(locator.dev_server()?, &config.server);
        launcher.terminate_grace = config.browser.terminate_grace();
        let registry = Arc::new(DevServerRegistry::new(launcher));
        let generator = Arc::new(FileHarnessGenerator::new(config.browser.generated_dir.clone()));

        Ok(Self::new(config, browser, registry, generator))
    }

    pub fn registry(&self) -> &Arc<DevServerRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DrtConfig {
        &self.config
    }

    /// URL of the harness page for `descriptor` on the dev server
    pub fn harness_url(&self, descriptor: &TestDescriptor) -> String {
        format!(
            "{}/{}/{}",
            self.config.server_url(),
            self.config.browser.generated_dir,
            descriptor.harness_file_name()
        )
    }

    /// Full browser argument list for `url`
    pub fn browser_args(url: &str) -> Vec<String> {
        BROWSER_FLAGS
            .iter()
            .map(|flag| flag.to_string())
            .chain(std::iter::once(url.to_string()))
            .collect()
    }

    /// Run one test to completion
    pub async fn run_test(&self, descriptor: &TestDescriptor) -> Result<TestExecutionResult> {
        self.run_test_with_cancel(descriptor, CancellationToken::new())
            .await
    }

    /// Run one test, stopping early with a `Cancelled` result when `cancel` fires
    pub async fn run_test_with_cancel(
        &self,
        descriptor: &TestDescriptor,
        cancel: CancellationToken,
    ) -> Result<TestExecutionResult> {
        let deadline = self
            .config
            .browser
            .timeout()
            .map(|timeout| Instant::now() + timeout);
        let timer = async {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };
        tokio::pin!(timer);

        let accumulator = RunAccumulator::new(descriptor.clone())
            .require_terminal_marker(self.config.browser.require_terminal_marker);

        info!(test = %descriptor.test_name(), project = %descriptor.project_root().display(), "Setting up test");

        let readiness = self.registry.acquire(descriptor.project_root());
        let setup = async {
            tokio::try_join!(
                self.generator.generate_page(descriptor),
                self.generator.generate_script(descriptor),
                readiness.wait(),
            )
        };

        tokio::select! {
            setup = setup => {
                setup?;
            }
            _ = cancel.cancelled() => {
                info!(test = %descriptor.test_name(), "Cancelled during setup");
                return Ok(accumulator.into_aborted(Outcome::Cancelled));
            }
            _ = &mut timer => {
                warn!(test = %descriptor.test_name(), "Timed out during setup");
                return Ok(accumulator.into_aborted(Outcome::TimedOut));
            }
        }

        let url = self.harness_url(descriptor);
        let args = Self::browser_args(&url);
        debug!("Browser command: {} {}", self.browser.display(), args.join(" "));

        let mut command = Command::new(&self.browser);
        command.args(&args).kill_on_drop(true);
        let process = SpawnedProcess::spawn(command, &self.browser.display().to_string())?
            .with_drain_grace(self.config.browser.exit_drain_grace());

        let result = self.supervise(process, accumulator, cancel, timer).await;

        info!(
            test = %descriptor.test_name(),
            outcome = %result.outcome,
            success = result.success,
            duration_ms = result.duration_ms,
            "Test completed"
        );
        Ok(result)
    }

    async fn supervise<T>(
        &self,
        mut process: SpawnedProcess,
        mut accumulator: RunAccumulator,
        cancel: CancellationToken,
        mut timer: std::pin::Pin<&mut T>,
    ) -> TestExecutionResult
    where
        T: std::future::Future<Output = ()>,
    {
        let result = loop {
            let completion = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(pid = process.pid(), "Run cancelled");
                    accumulator.on_cancel()
                }
                _ = &mut timer => {
                    warn!(pid = process.pid(), "Run timed out");
                    accumulator.on_timeout()
                }
                event = process.next_event() => match event {
                    Ok(ProcessEvent::Line(StreamLine::Stdout(line))) => accumulator.on_stdout_line(&line),
                    Ok(ProcessEvent::Line(StreamLine::Stderr(line))) => {
                        accumulator.on_stderr_line(&line);
                        None
                    }
                    Ok(ProcessEvent::Exited(status)) => {
                        debug!(?status, "Browser exited, draining output");
                        None
                    }
                    Ok(ProcessEvent::Closed) => {
                        let exit_code = process.exit_status().and_then(|status| status.code());
                        warn!(?exit_code, "Browser exited without terminal marker");
                        accumulator.on_exit(exit_code)
                    }
                    Err(e) => {
                        warn!("Lost track of browser process: {}", e);
                        accumulator.on_stderr_line(&format!("drt: {}", e));
                        accumulator.on_exit(None)
                    }
                },
            };

            if let Some(result) = completion {
                break result;
            }
        };

        if result.outcome == Outcome::Crashed {
            warn!(pid = process.pid(), "Rendering engine crashed");
        }
        process.terminate(self.config.browser.terminate_grace()).await;

        result
    }
}
