//! Animation timing

use crate::error::TransitionError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing of one animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Total animation length in milliseconds
    pub duration_ms: u64,
    /// Number of steps the duration is divided into
    pub step_count: u32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration_ms: 1_500,
            step_count: 60,
        }
    }
}

impl TransitionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With total duration
    #[inline]
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With step count
    #[inline]
    #[must_use]
    pub fn with_step_count(mut self, steps: u32) -> Self {
        self.step_count = steps;
        self
    }

    /// Total duration
    #[inline]
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Interval between ticks
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.duration() / self.step_count.max(1)
    }

    /// Reject zero duration or step count
    ///
    /// # Errors
    /// `InvalidConfig` naming the field
    pub fn validate(&self) -> Result<(), TransitionError> {
        if self.step_count == 0 {
            return Err(TransitionError::InvalidConfig(
                "step_count must be non-zero".to_string(),
            ));
        }
        if self.duration_ms == 0 {
            return Err(TransitionError::InvalidConfig(
                "duration_ms must be non-zero".to_string(),
            ));
        }
        if self.tick_interval().is_zero() {
            return Err(TransitionError::InvalidConfig(format!(
                "{} steps do not fit in {} ms",
                self.step_count, self.duration_ms
            )));
        }
        Ok(())
    }
}
