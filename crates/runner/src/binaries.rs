//! Locating the rendering engine and dev server launcher

use std::path::PathBuf;

use tracing::debug;

use drt_common::{DrtConfig, Error, Result};

/// Environment override for the rendering engine binary
pub const BROWSER_ENV: &str = "DRT_BROWSER";

/// Environment override for the dev server launcher
pub const DEV_SERVER_ENV: &str = "DRT_DEV_SERVER";

/// Default rendering engine looked up on `PATH`
pub const DEFAULT_BROWSER: &str = "content_shell";

/// Default dev server launcher looked up on `PATH`
pub const DEFAULT_DEV_SERVER: &str = "pub";

/// Supplies executable paths, resolved before anything is spawned
pub trait BinaryLocator: Send + Sync {
    fn browser(&self) -> Result<PathBuf>;
    fn dev_server(&self) -> Result<PathBuf>;
}

/// Explicit config path, then environment override, then `PATH` lookup
#[derive(Debug, Clone, Default)]
pub struct ConfiguredBinaries {
    browser: Option<PathBuf>,
    dev_server: Option<PathBuf>,
}

impl ConfiguredBinaries {
    pub fn new(browser: Option<PathBuf>, dev_server: Option<PathBuf>) -> Self {
        Self {
            browser,
            dev_server,
        }
    }

    pub fn from_config(config: &DrtConfig) -> Self {
        Self::new(config.browser.binary.clone(), config.server.binary.clone())
    }
}

impl BinaryLocator for ConfiguredBinaries {
    fn browser(&self) -> Result<PathBuf> {
        resolve(self.browser.as_ref(), BROWSER_ENV, DEFAULT_BROWSER)
    }

    fn dev_server(&self) -> Result<PathBuf> {
        resolve(self.dev_server.as_ref(), DEV_SERVER_ENV, DEFAULT_DEV_SERVER)
    }
}

fn resolve(explicit: Option<&PathBuf>, env_var: &str, default: &str) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return check_exists(path.clone(), default);
    }

    if let Some(path) = std::env::var_os(env_var).filter(|v| !v.is_empty()) {
        debug!("{} set, using {:?}", env_var, path);
        return check_exists(PathBuf::from(path), default);
    }

    which::which(default).map_err(|_| Error::BinaryNotFound {
        name: default.to_string(),
    })
}

fn check_exists(path: PathBuf, name: &str) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::BinaryNotFound {
            name: format!("{} at {}", name, path.display()),
        })
    }
}
