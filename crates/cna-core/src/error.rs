//! Error types for CNA Core
//!
//! [`AnalyticsError`] is what session and loading callers see. It wraps the
//! per-crate errors so `?` works across the whole pipeline.

use cna_contract::ContractError;
use cna_metrics::ConfigError;
use cna_transition::TransitionError;
use std::path::PathBuf;

/// Main analytics error type
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Contract rejected or edit refused
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),

    /// Market table or engine configuration rejected
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Animation engine failure
    #[error("transition error: {0}")]
    Transition(#[from] TransitionError),

    /// Uploaded contract could not be read
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// Session task has stopped
    #[error("analytics session closed")]
    SessionClosed,

    /// IO error
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AnalyticsError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if the caller supplied something invalid
    #[inline]
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Contract(_)
                | Self::InvalidUpload(_)
                | Self::Config(
                    ConfigError::InvalidTable(_)
                        | ConfigError::Toml(_)
                        | ConfigError::Yaml(_)
                        | ConfigError::UnsupportedFormat(_)
                )
                | Self::Transition(TransitionError::InvalidConfig(_))
        )
    }

    /// Check if the operation may succeed when repeated
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Config(ConfigError::Io { .. })
        )
    }
}
