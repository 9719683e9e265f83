//! Error types for the transition engine

use crate::state::AnimationState;

/// Transition errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// State machine rejected a transition
    #[error("illegal animation transition: {from} -> {to}")]
    IllegalTransition {
        from: AnimationState,
        to: AnimationState,
    },

    /// Timing configuration rejected
    #[error("invalid transition config: {0}")]
    InvalidConfig(String),
}

impl TransitionError {
    /// Check if this is a programming error rather than bad input
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::IllegalTransition { .. })
    }
}
