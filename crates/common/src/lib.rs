//! drt Common Library
//!
//! Shared types, errors and configuration for the drt browser test engine.

pub mod config;
pub mod error;
pub mod types;

pub use config::{BrowserConfig, DrtConfig, ServerConfig};
pub use error::{Error, Result};
pub use types::*;

/// drt version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "drt.toml";
