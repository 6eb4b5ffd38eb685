//! TOML configuration for building a provider.
//!
//! ```toml
//! [log]
//! filter = "dirwrap=debug"
//!
//! [provider]
//! kind = "local"
//! root = "/srv/data"
//! read_only = true
//! io_timeout_ms = 2000
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::backends::{LocalBackend, ManifestBackend, MemoryBackend};
use crate::error::DirError;
use crate::provider::DirectoryProvider;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for [`Config`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Provider could not be constructed from its settings.
    #[error("invalid provider settings: {0}")]
    Provider(#[source] DirError),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    pub provider: ProviderConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `tracing-subscriber` filter directive; `RUST_LOG` wins when set.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

/// Which backend to build, and its settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Empty in-memory tree.
    Memory,
    /// Real directories under `root`.
    Local {
        root: PathBuf,
        #[serde(default)]
        read_only: bool,
        #[serde(default)]
        io_timeout_ms: Option<u64>,
    },
    /// Read-only tree described by a list of paths.
    Manifest { entries: Vec<String> },
}

impl ProviderConfig {
    /// Build the configured provider.
    pub fn build(&self) -> Result<Arc<dyn DirectoryProvider>, ConfigError> {
        let provider: Arc<dyn DirectoryProvider> = match self {
            ProviderConfig::Memory => Arc::new(MemoryBackend::new()),
            ProviderConfig::Local {
                root,
                read_only,
                io_timeout_ms,
            } => {
                let mut backend = if *read_only {
                    LocalBackend::read_only(root)
                } else {
                    LocalBackend::new(root)
                };
                if let Some(ms) = io_timeout_ms {
                    backend = backend.with_io_timeout(Duration::from_millis(*ms));
                }
                Arc::new(backend)
            }
            ProviderConfig::Manifest { entries } => Arc::new(
                ManifestBackend::from_entries(entries).map_err(ConfigError::Provider)?,
            ),
        };
        Ok(provider)
    }
}

/// Parse configuration from TOML text.
pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Read and parse a configuration file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}
