//! Per-series animation state machine
//!
//! `Idle -> Animating -> Idle`. A retarget while animating restarts in place
//! and does not pass through the state machine.

use crate::error::TransitionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Animation state of one series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationState {
    /// Rendered values equal the target
    Idle,
    /// Stepping toward the target
    Animating,
}

impl fmt::Display for AnimationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Animating => "animating",
        })
    }
}

/// Validate a state transition
///
/// # Errors
/// `IllegalTransition` when `to` is not reachable from `from`
pub fn validate_transition(from: AnimationState, to: AnimationState) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::IllegalTransition { from, to })
    }
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: AnimationState) -> &'static [AnimationState] {
    use AnimationState::*;
    match from {
        Idle => &[Animating],
        Animating => &[Idle],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AnimationState::*;

    #[test]
    fn idle_animating_cycle() {
        assert!(validate_transition(Idle, Animating).is_ok());
        assert!(validate_transition(Animating, Idle).is_ok());
    }

    #[test]
    fn self_transitions_are_illegal() {
        assert_eq!(
            validate_transition(Idle, Idle),
            Err(TransitionError::IllegalTransition { from: Idle, to: Idle })
        );
        assert!(validate_transition(Animating, Animating).is_err());
    }
}
