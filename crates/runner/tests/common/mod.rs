//! Shared fixtures: throwaway projects and shell scripts standing in for
//! the rendering engine and the dev server launcher.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use drt_common::{DrtConfig, ServerConfig};
use drt_runner::{DevServerLauncher, DevServerRegistry, FileHarnessGenerator, TestExecutor};
use tempfile::TempDir;

/// Dev server that reports readiness and keeps serving
pub const READY_SERVER: &str = r#"echo started >> spawns.log
echo "Loading source assets..."
echo "Serving app test on http://localhost:8080"
echo "Build completed successfully"
exec sleep 60
"#;

/// Dev server that dies before readiness
pub const FAILING_SERVER: &str = r#"echo started >> spawns.log
echo "Resolving dependencies..."
echo "Could not find a file named pubspec.yaml" >&2
exit 1
"#;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Write an executable `sh` script
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Project root with a `test/` directory holding one test file
pub fn project(root: &Path, name: &str) -> PathBuf {
    let project = root.join(name);
    std::fs::create_dir_all(project.join("test")).unwrap();
    std::fs::write(project.join("test").join("app_test.dart"), "void main() {}\n").unwrap();
    project
}

/// Number of times a fake dev server was started in `project`
pub fn spawn_count(project: &Path) -> usize {
    std::fs::read_to_string(project.join("spawns.log"))
        .map(|log| log.lines().count())
        .unwrap_or(0)
}

pub fn test_config() -> DrtConfig {
    let mut config = DrtConfig::default();
    config.browser.terminate_grace_ms = 500;
    config.browser.exit_drain_grace_ms = 500;
    config
}

pub fn registry(server_script: &Path) -> Arc<DevServerRegistry> {
    let mut launcher = DevServerLauncher::new(server_script, &ServerConfig::default());
    launcher.terminate_grace = std::time::Duration::from_millis(500);
    Arc::new(DevServerRegistry::new(launcher))
}

/// Fixture owning the scratch directory, the fake binaries and an executor
pub struct Fixture {
    pub dir: TempDir,
    pub project: PathBuf,
    pub executor: TestExecutor,
}

impl Fixture {
    pub fn new(server_body: &str, browser_body: &str, config: DrtConfig) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();

        let server = write_script(&bin, "pub", server_body);
        let browser = write_script(&bin, "content_shell", browser_body);
        let project = project(dir.path(), "app");

        let generator = Arc::new(FileHarnessGenerator::new(config.browser.generated_dir.clone()));
        let executor = TestExecutor::new(config, browser, registry(&server), generator);

        Self {
            dir,
            project,
            executor,
        }
    }
}
