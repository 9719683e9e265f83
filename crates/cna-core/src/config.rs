//! Engine configuration
//!
//! Bundles the market table, animation timing and signal seeding. Loadable
//! from TOML or YAML; every table falls back to its default when omitted.

use crate::error::AnalyticsError;
use crate::publisher::DEFAULT_FRAME_BUFFER;
use cna_metrics::{ConfigError, MarketConfig, SeededSignals, SignalProvider};
use cna_transition::TransitionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Analytics engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Market reference tables
    pub market: MarketConfig,
    /// Animation timing
    pub transition: TransitionConfig,
    /// Seed for the flexibility signal; entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_seed: Option<u64>,
    /// Capacity of the session command channel
    pub command_buffer: usize,
    /// Frames retained per subscriber; slower readers skip ahead
    pub frame_buffer: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            market: MarketConfig::default(),
            transition: TransitionConfig::default(),
            signal_seed: None,
            command_buffer: 64,
            frame_buffer: DEFAULT_FRAME_BUFFER,
        }
    }
}

impl AnalyticsConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With market tables
    #[inline]
    #[must_use]
    pub fn with_market(mut self, market: MarketConfig) -> Self {
        self.market = market;
        self
    }

    /// With animation timing
    #[inline]
    #[must_use]
    pub fn with_transition(mut self, transition: TransitionConfig) -> Self {
        self.transition = transition;
        self
    }

    /// With deterministic signal seed
    #[inline]
    #[must_use]
    pub fn with_signal_seed(mut self, seed: u64) -> Self {
        self.signal_seed = Some(seed);
        self
    }

    /// With command channel capacity
    #[inline]
    #[must_use]
    pub fn with_command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity;
        self
    }

    /// With per-subscriber frame retention
    #[inline]
    #[must_use]
    pub fn with_frame_buffer(mut self, capacity: usize) -> Self {
        self.frame_buffer = capacity;
        self
    }

    /// Validate every section
    ///
    /// # Errors
    /// The first section that fails validation
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        self.market.validate()?;
        self.transition.validate()?;
        if self.command_buffer == 0 {
            return Err(ConfigError::InvalidTable("command_buffer must be non-zero".to_string()).into());
        }
        if self.frame_buffer == 0 {
            return Err(ConfigError::InvalidTable("frame_buffer must be non-zero".to_string()).into());
        }
        Ok(())
    }

    /// Signal provider for this configuration
    #[must_use]
    pub fn signal_provider(&self) -> Box<dyn SignalProvider> {
        match self.signal_seed {
            Some(seed) => Box::new(SeededSignals::new(seed)),
            None => Box::new(SeededSignals::from_os_rng()),
        }
    }

    /// Parse from TOML string
    ///
    /// # Errors
    /// Parse failure or invalid section
    pub fn from_toml_str(input: &str) -> Result<Self, AnalyticsError> {
        let config: Self = toml::from_str(input).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from YAML string
    ///
    /// # Errors
    /// Parse failure or invalid section
    pub fn from_yaml_str(input: &str) -> Result<Self, AnalyticsError> {
        let config: Self = serde_yaml::from_str(input).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml`, `.yaml` or `.yml` file
    ///
    /// # Errors
    /// IO failure, unsupported extension, parse failure or invalid section
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnalyticsError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| AnalyticsError::io_error(path, e))?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text)?,
            Some("yaml" | "yml") => Self::from_yaml_str(&text)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(other.unwrap_or_default().to_string()).into())
            }
        };
        tracing::info!(path = %path.display(), "Loaded analytics config");
        Ok(config)
    }
}
