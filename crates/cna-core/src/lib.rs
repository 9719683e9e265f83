//! CNA Core - contract analytics sessions
//!
//! Ties the pipeline together:
//! - edits go through the [`cna_contract::ContractStore`]
//! - metrics and chart targets are re-derived on every change
//! - the [`cna_transition::TransitionScheduler`] eases rendered series toward
//!   the new targets
//! - the [`ViewModelPublisher`] emits one [`ViewModelFrame`] per step
//!
//! # Example
//!
//! ```rust,ignore
//! use cna_core::{AnalyticsConfig, AnalyticsSession};
//! use serde_json::json;
//!
//! # async fn example(snapshot: cna_contract::ContractSnapshot) -> Result<(), cna_core::AnalyticsError> {
//! let session = AnalyticsSession::spawn(snapshot, AnalyticsConfig::default())?;
//! let mut frames = session.subscribe().await?;
//!
//! session.edit("totalSpend", json!(4_000_000)).await?;
//! while let Some(frame) = frames.recv().await {
//!     if !frame.animating {
//!         break;
//!     }
//! }
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod publisher;
pub mod session;
pub mod types;
pub mod upload;

pub use config::AnalyticsConfig;
pub use error::AnalyticsError;
pub use publisher::{FrameSubscription, ViewModelFrame, ViewModelPublisher, DEFAULT_FRAME_BUFFER};
pub use session::{AnalyticsSession, SessionCommand, SessionHandle};
pub use types::{SessionId, SubscriberId};
pub use upload::{contract_from_json, contract_from_yaml, load_contract};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running an analytics session
    pub use crate::{
        AnalyticsConfig, AnalyticsError, AnalyticsSession, FrameSubscription, SessionHandle,
        ViewModelFrame,
    };
    pub use cna_contract::{ContractEdit, ContractSnapshot, ServiceTerm};
    pub use cna_metrics::{ChartSeriesSet, DerivedMetrics, SeriesKey};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
