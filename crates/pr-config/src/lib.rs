//! Typed run configuration.
//!
//! CLI flag parsing and full config-file discovery (searching upward for a
//! project config, merging multiple sources) stay external; this crate only
//! owns the typed shape the orchestrator is constructed from and a minimal
//! TOML file loader.

mod model;

use std::path::Path;

use thiserror::Error;

pub use model::{Config, RawConfig, ScopeMode, sanitise_target};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Load a config from a TOML file. Every field is optional on disk; a
    /// missing field falls back to [`Config::new()`]'s default.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
                path: path_ref.display().to_string(),
                source,
            })?;
        let raw: RawConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path_ref.display().to_string(),
                source,
            })?;
        Ok(raw.into_config())
    }
}
