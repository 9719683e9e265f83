//! Interpolation scheduler
//!
//! Owns one [`SeriesAnimation`] per chart and advances all of them on each
//! tick. The scheduler does not own a timer; the caller drives [`tick`] from
//! whatever interval it runs. Once the [`CancellationToken`] fires, no
//! further step is applied.
//!
//! [`tick`]: TransitionScheduler::tick

use crate::animation::{RetargetOutcome, SeriesAnimation, StepOutcome};
use crate::cancel::CancellationToken;
use crate::config::TransitionConfig;
use crate::error::TransitionError;
use cna_metrics::{ChartSeriesSet, SeriesKey};
use std::collections::BTreeMap;

/// Result of one scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing was animating
    Idle,
    /// At least one series moved and some are still animating
    Advanced { animating: usize },
    /// The last animating series reached its target on this tick
    Converged,
    /// Token cancelled; nothing was stepped
    Cancelled,
}

impl TickOutcome {
    /// Whether this tick changed rendered values
    #[inline]
    #[must_use]
    pub fn changed(&self) -> bool {
        matches!(self, Self::Advanced { .. } | Self::Converged)
    }
}

/// Per-series animation driver
#[derive(Debug)]
pub struct TransitionScheduler {
    config: TransitionConfig,
    animations: BTreeMap<SeriesKey, SeriesAnimation>,
    token: CancellationToken,
}

impl TransitionScheduler {
    /// Create scheduler with every series empty and idle
    ///
    /// # Errors
    /// `InvalidConfig` if the timing configuration is rejected
    pub fn new(config: TransitionConfig) -> Result<Self, TransitionError> {
        config.validate()?;
        let animations = SeriesKey::ALL
            .into_iter()
            .map(|key| (key, SeriesAnimation::new(Vec::new(), config.step_count)))
            .collect();
        Ok(Self {
            config,
            animations,
            token: CancellationToken::new(),
        })
    }

    /// With externally owned cancellation token
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    /// Token checked before every tick
    #[inline]
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Animation of one series
    #[inline]
    #[must_use]
    pub fn animation(&self, key: SeriesKey) -> Option<&SeriesAnimation> {
        self.animations.get(&key)
    }

    /// Whether any series is animating
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.animations.values().any(SeriesAnimation::is_animating)
    }

    /// Rendered values of every series
    #[must_use]
    pub fn current(&self) -> ChartSeriesSet {
        self.animations
            .iter()
            .map(|(key, anim)| (*key, anim.current().clone()))
            .collect()
    }

    /// Targets of every series
    #[must_use]
    pub fn targets(&self) -> ChartSeriesSet {
        self.animations
            .iter()
            .map(|(key, anim)| (*key, anim.target().clone()))
            .collect()
    }

    /// Point every series present in `targets` at its new values
    ///
    /// Returns the number of series that started or restarted animating.
    /// After cancellation targets are still recorded but shown immediately.
    ///
    /// # Errors
    /// `IllegalTransition` if a series state machine rejects the move
    pub fn retarget(&mut self, mut targets: ChartSeriesSet) -> Result<usize, TransitionError> {
        let mut started = 0;
        for (key, anim) in &mut self.animations {
            let Some(target) = targets.remove(*key) else {
                continue;
            };
            let outcome = anim.retarget(target)?;
            tracing::trace!(series = %key, ?outcome, "Retargeted series");
            match outcome {
                RetargetOutcome::Started | RetargetOutcome::Restarted => started += 1,
                RetargetOutcome::Unchanged | RetargetOutcome::Snapped => {}
            }
            if self.token.is_cancelled() {
                anim.settle()?;
            }
        }

        if started > 0 && !self.token.is_cancelled() {
            tracing::debug!(started, "Animations retargeted");
        }
        Ok(started)
    }

    /// Advance every animating series by one step
    ///
    /// # Errors
    /// `IllegalTransition` if a series state machine rejects the move
    pub fn tick(&mut self) -> Result<TickOutcome, TransitionError> {
        if self.token.is_cancelled() {
            return Ok(TickOutcome::Cancelled);
        }

        let mut moved = false;
        let mut animating = 0;
        for (key, anim) in &mut self.animations {
            match anim.step()? {
                StepOutcome::Idle => {}
                StepOutcome::Advanced => {
                    moved = true;
                    animating += 1;
                }
                StepOutcome::Converged => {
                    moved = true;
                    tracing::trace!(series = %key, "Series converged");
                }
            }
        }

        Ok(match (moved, animating) {
            (false, _) => TickOutcome::Idle,
            (true, 0) => {
                tracing::debug!("All series converged");
                TickOutcome::Converged
            }
            (true, animating) => TickOutcome::Advanced { animating },
        })
    }

    /// Cut every in-flight animation short, leaving targets rendered
    ///
    /// Returns the number of animations cancelled.
    ///
    /// # Errors
    /// `IllegalTransition` if a series state machine rejects the move
    pub fn settle_all(&mut self) -> Result<usize, TransitionError> {
        let mut settled = 0;
        for anim in self.animations.values_mut() {
            if anim.settle()? {
                settled += 1;
            }
        }
        if settled > 0 {
            tracing::info!(settled, "In-flight animations cancelled");
        }
        Ok(settled)
    }

    /// Stop stepping for good
    pub fn cancel(&self) {
        tracing::debug!("Transition scheduler cancelled");
        self.token.cancel();
    }
}
