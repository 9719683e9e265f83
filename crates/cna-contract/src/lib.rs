//! CNA Contract - contract snapshots and the contract record store
//!
//! - [`ContractSnapshot`]: immutable carrier/spend/services record
//! - [`ServiceTerm`]: one negotiated service line, identified by position
//! - [`ContractStore`]: applies field-level edits and publishes new snapshots
//!
//! # Example
//!
//! ```rust
//! use cna_contract::{ContractSnapshot, ContractStore, ServiceTerm};
//! use serde_json::json;
//!
//! let upload = ContractSnapshot::new(
//!     "UPS",
//!     1_000_000.0,
//!     vec![ServiceTerm::new("Ground", "1-5 lbs", 10.0)],
//! );
//! let mut store = ContractStore::open(upload).unwrap();
//!
//! let snapshot = store
//!     .apply_edit("services", json!([
//!         {"type": "Ground", "weightRange": "1-5 lbs", "currentDiscount": "20%"}
//!     ]))
//!     .unwrap();
//! assert!((snapshot.total_spend() - 800_000.0).abs() < 1e-9);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod service;
mod snapshot;
mod store;

pub use error::ContractError;
pub use service::{parse_discount_percent, ServiceClass, ServiceField, ServiceTerm, DISCOUNT_RANGE};
pub use snapshot::{
    mean_discount_fraction, recompute_total_spend, validate_spend, ContractSnapshot, RECORD_FIELD_COUNT,
};
pub use store::{fields, ContractEdit, ContractStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
