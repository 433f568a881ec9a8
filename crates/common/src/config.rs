//! drt configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Top-level configuration, usually read from `drt.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrtConfig {
    /// Dev server configuration
    pub server: ServerConfig,

    /// Browser configuration
    pub browser: BrowserConfig,
}

/// Dev server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Path to the dev server launcher (auto-detected when unset)
    pub binary: Option<PathBuf>,

    /// Host the harness URL points at
    pub host: String,

    /// Port the dev server listens on
    pub port: u16,

    /// Substring of a stdout line that means the server is ready
    pub ready_marker: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary: None,
            host: "127.0.0.1".to_string(),
            port: 8080,
            ready_marker: "Build completed".to_string(),
        }
    }
}

/// Browser test process configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Path to the headless rendering engine (auto-detected when unset)
    pub binary: Option<PathBuf>,

    /// Directory under `test/` that harness files are generated into
    pub generated_dir: String,

    /// How long to keep classifying buffered output after the process exits
    pub exit_drain_grace_ms: u64,

    /// How long to wait after SIGTERM before killing the process
    pub terminate_grace_ms: u64,

    /// Deadline for a single test; unset means no deadline
    pub timeout_secs: Option<u64>,

    /// Report a pass as unsuccessful when the terminal marker never arrived
    pub require_terminal_marker: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary: None,
            generated_dir: "__drt_generated".to_string(),
            exit_drain_grace_ms: 2000,
            terminate_grace_ms: 2000,
            timeout_secs: None,
            require_terminal_marker: false,
        }
    }
}

impl BrowserConfig {
    pub fn exit_drain_grace(&self) -> Duration {
        Duration::from_millis(self.exit_drain_grace_ms)
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl DrtConfig {
    /// Load configuration from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::InvalidConfig("server.port must not be 0".to_string()));
        }
        if self.server.ready_marker.is_empty() {
            return Err(Error::InvalidConfig(
                "server.ready_marker must not be empty".to_string(),
            ));
        }
        let generated = Path::new(&self.browser.generated_dir);
        if self.browser.generated_dir.is_empty()
            || generated.is_absolute()
            || generated.components().count() != 1
        {
            return Err(Error::InvalidConfig(format!(
                "browser.generated_dir must be a single directory name, got {:?}",
                self.browser.generated_dir
            )));
        }
        Ok(())
    }

    /// Base URL the dev server answers on
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server.host, self.server.port)
    }
}
