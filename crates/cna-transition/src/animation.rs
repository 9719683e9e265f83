//! Animation of a single chart series
//!
//! A [`SeriesAnimation`] owns the start, target and rendered values of one
//! series. Retargeting mid-flight restarts from whatever is currently
//! rendered, never from the values before the animation began.

use crate::easing::ease_out_cubic;
use crate::error::TransitionError;
use crate::interpolate::interpolate_series;
use crate::state::{validate_transition, AnimationState};
use cna_metrics::Series;
use serde::{Deserialize, Serialize};

/// Observable state of one series animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationFrame {
    /// Values rendered when the current animation began
    pub start: Series,
    /// Values the animation converges on
    pub target: Series,
    /// Values rendered now
    pub current: Series,
    /// Fraction of steps taken, `[0, 1]`
    pub progress: f64,
    pub state: AnimationState,
}

/// Result of [`SeriesAnimation::retarget`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetargetOutcome {
    /// Target equals the running target
    Unchanged,
    /// Idle series started animating
    Started,
    /// Animating series restarted from its rendered values
    Restarted,
    /// Lengths differ; rendered values jumped to the target
    Snapped,
}

/// Result of [`SeriesAnimation::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing to do
    Idle,
    /// Moved one step, still animating
    Advanced,
    /// Reached the target exactly
    Converged,
}

/// Animation of one series toward its latest target
#[derive(Debug, Clone)]
pub struct SeriesAnimation {
    frame: AnimationFrame,
    step: u32,
    step_count: u32,
}

impl SeriesAnimation {
    /// Create idle animation showing `initial`
    #[must_use]
    pub fn new(initial: Series, step_count: u32) -> Self {
        Self {
            frame: AnimationFrame {
                start: initial.clone(),
                target: initial.clone(),
                current: initial,
                progress: 1.0,
                state: AnimationState::Idle,
            },
            step: 0,
            step_count: step_count.max(1),
        }
    }

    /// Current frame
    #[inline]
    #[must_use]
    pub fn frame(&self) -> &AnimationFrame {
        &self.frame
    }

    /// Rendered values
    #[inline]
    #[must_use]
    pub fn current(&self) -> &Series {
        &self.frame.current
    }

    /// Values being converged on
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Series {
        &self.frame.target
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> AnimationState {
        self.frame.state
    }

    #[inline]
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.frame.progress
    }

    #[inline]
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.frame.state == AnimationState::Animating
    }

    /// Point the animation at a new target
    ///
    /// # Errors
    /// `IllegalTransition` if the state machine rejects the move (internal)
    pub fn retarget(&mut self, target: Series) -> Result<RetargetOutcome, TransitionError> {
        if target == self.frame.target {
            return Ok(RetargetOutcome::Unchanged);
        }

        if target.len() != self.frame.current.len() {
            self.jump_to(target)?;
            return Ok(RetargetOutcome::Snapped);
        }

        let outcome = if self.is_animating() {
            RetargetOutcome::Restarted
        } else {
            self.transition(AnimationState::Animating)?;
            RetargetOutcome::Started
        };
        self.frame.start = self.frame.current.clone();
        self.frame.target = target;
        self.frame.progress = 0.0;
        self.step = 0;
        Ok(outcome)
    }

    /// Advance one step
    ///
    /// # Errors
    /// `IllegalTransition` if the state machine rejects the move (internal)
    pub fn step(&mut self) -> Result<StepOutcome, TransitionError> {
        if !self.is_animating() {
            return Ok(StepOutcome::Idle);
        }

        self.step = self.step.saturating_add(1);
        if self.step >= self.step_count {
            self.finish()?;
            return Ok(StepOutcome::Converged);
        }

        let progress = f64::from(self.step) / f64::from(self.step_count);
        self.frame.progress = progress;
        self.frame.current =
            interpolate_series(&self.frame.start, &self.frame.target, ease_out_cubic(progress));
        Ok(StepOutcome::Advanced)
    }

    /// Abandon remaining steps and show the target
    ///
    /// Returns whether an animation was cut short.
    ///
    /// # Errors
    /// `IllegalTransition` if the state machine rejects the move (internal)
    pub fn settle(&mut self) -> Result<bool, TransitionError> {
        if !self.is_animating() {
            return Ok(false);
        }
        self.finish()?;
        Ok(true)
    }

    fn finish(&mut self) -> Result<(), TransitionError> {
        self.transition(AnimationState::Idle)?;
        // assign rather than interpolate so no float residue survives
        self.frame.current = self.frame.target.clone();
        self.frame.start = self.frame.target.clone();
        self.frame.progress = 1.0;
        Ok(())
    }

    fn jump_to(&mut self, target: Series) -> Result<(), TransitionError> {
        if self.is_animating() {
            self.transition(AnimationState::Idle)?;
        }
        self.frame.start = target.clone();
        self.frame.current = target.clone();
        self.frame.target = target;
        self.frame.progress = 1.0;
        self.step = 0;
        Ok(())
    }

    fn transition(&mut self, to: AnimationState) -> Result<(), TransitionError> {
        validate_transition(self.frame.state, to)?;
        self.frame.state = to;
        Ok(())
    }
}
