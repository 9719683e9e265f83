//! Error types for market configuration
//!
//! Derivation itself reports [`cna_contract::ContractError`]; this module
//! only covers loading and validating the static market tables.

use std::path::PathBuf;

/// Market configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Table content violates an invariant
    #[error("invalid market table: {0}")]
    InvalidTable(String),

    /// TOML parse failure
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parse failure
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File extension is neither TOML nor YAML
    #[error("unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    /// IO error reading a config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
