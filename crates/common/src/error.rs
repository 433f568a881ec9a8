//! Error types for drt

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using drt Error
pub type Result<T> = std::result::Result<T, Error>;

/// drt error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Harness generation failed for {}: {reason}", path.display())]
    GenerationFailed { path: PathBuf, reason: String },

    #[error("Dev server for {} failed to start\n{log}", project.display())]
    ServerStartupFailed { project: PathBuf, log: String },

    #[error("Binary not found: {name}")]
    BinaryNotFound { name: String },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid test descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether the error happened before any browser process was launched
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            Error::GenerationFailed { .. }
                | Error::ServerStartupFailed { .. }
                | Error::BinaryNotFound { .. }
                | Error::InvalidDescriptor(_)
        )
    }
}
