//! CNA Transition - animated chart series
//!
//! Moves rendered chart values toward freshly derived targets over a fixed
//! number of eased steps:
//! - [`ease_out_cubic`] and [`interpolate_series`]: the blend itself
//! - [`SeriesAnimation`]: `Idle -> Animating -> Idle` for one series
//! - [`TransitionScheduler`]: one animation per chart, stepped per tick and
//!   guarded by a [`CancellationToken`]

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod animation;
mod cancel;
mod config;
mod easing;
mod error;
mod interpolate;
mod scheduler;
mod state;

pub use animation::{AnimationFrame, RetargetOutcome, SeriesAnimation, StepOutcome};
pub use cancel::CancellationToken;
pub use config::TransitionConfig;
pub use easing::ease_out_cubic;
pub use error::TransitionError;
pub use interpolate::{interpolate_record, interpolate_series};
pub use scheduler::{TickOutcome, TransitionScheduler};
pub use state::{allowed_transitions, validate_transition, AnimationState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
