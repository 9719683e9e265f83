//! CNA Metrics - metric derivation and chart series
//!
//! Turns a validated [`cna_contract::ContractSnapshot`] into:
//! - [`DerivedMetrics`]: discount targets, opportunities, flexibility and risk
//! - [`ChartSeriesSet`]: the five chart-ready series
//!
//! Market data (competitor benchmarks, historical indices, uplifts, the
//! opportunity catalogue) lives in [`MarketConfig`], and the vendor
//! flexibility prediction comes from a [`SignalProvider`].
//!
//! # Example
//!
//! ```rust
//! use cna_contract::{ContractSnapshot, ServiceTerm};
//! use cna_metrics::{build_series, derive_metrics, FixedSignals, MarketConfig, SignalProvider, Trend};
//!
//! let snapshot = ContractSnapshot::new(
//!     "UPS",
//!     5_000_000.0,
//!     vec![ServiceTerm::new("Ground", "1-5 lbs", 10.0)],
//! );
//! let config = MarketConfig::default();
//! let signal = FixedSignals::new(70, Trend::Up).next_signal();
//!
//! let metrics = derive_metrics(&snapshot, &config, signal).unwrap();
//! assert_eq!(metrics.services[0].recommended_discount, 15.0);
//!
//! let series = build_series(&snapshot, &config).unwrap();
//! assert_eq!(series.len(), 5);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod opportunity;
pub mod series;
pub mod signals;

pub use config::{CompetitorBenchmark, HistoricalPoint, MarketConfig, Uplift};
pub use error::ConfigError;
pub use metrics::{
    derive_metrics, DerivedMetrics, FlexibilityBand, MetricsEngine, NegotiationProgress,
    NegotiationStatus, RiskLevel, ServiceRecommendation, VendorFlexibility,
};
pub use opportunity::{
    default_opportunities, Opportunity, OpportunitySpec, ReferenceAmount, SavingsFormula,
    SpendReference,
};
pub use series::{build_series, ChartRecord, ChartSeriesSet, FieldValue, Series, SeriesKey};
pub use signals::{
    FixedSignals, FlexibilityScore, FlexibilitySignal, SeededSignals, SignalProvider, Trend,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for deriving metrics and series
    pub use crate::{
        build_series, derive_metrics, ChartSeriesSet, DerivedMetrics, MarketConfig,
        MetricsEngine, SeededSignals, SeriesKey, SignalProvider,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
