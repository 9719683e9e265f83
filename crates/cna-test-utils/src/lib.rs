//! Testing utilities for CNA workspace
//!
//! Shared contract fixtures and small assertion helpers.

#![allow(missing_docs)]

use cna_contract::{ContractSnapshot, ServiceTerm};
use cna_metrics::{ChartSeriesSet, FixedSignals, MarketConfig, MetricsEngine, Trend};
use std::sync::Arc;

/// Spend of the sample upload
pub const SAMPLE_SPEND: f64 = 5_750_000.0;

/// Single Ground line, 10 % discount, 5 000 000 spend
pub fn ups_contract() -> ContractSnapshot {
    ContractSnapshot::new(
        "UPS",
        5_000_000.0,
        vec![ServiceTerm::new("Ground", "1-5lbs", 10.0)],
    )
}

/// The six service lines of the sample upload
pub fn sample_services() -> Vec<ServiceTerm> {
    vec![
        ServiceTerm::new("Ground", "1-5 lbs", 10.0),
        ServiceTerm::new("Ground", "6-10 lbs", 12.0),
        ServiceTerm::new("2nd Day Air", "1-10 lbs", 15.0),
        ServiceTerm::new("2nd Day Air", "11-20 lbs", 18.0),
        ServiceTerm::new("Next Day Air", "1-5 lbs", 20.0),
        ServiceTerm::new("Next Day Air", "6-10 lbs", 22.0),
    ]
}

/// Sample upload with all six service lines
pub fn sample_contract() -> ContractSnapshot {
    ContractSnapshot::new("UPS", SAMPLE_SPEND, sample_services())
}

/// Sample upload as the ingestion collaborator delivers it
pub fn sample_contract_json() -> serde_json::Value {
    serde_json::json!({
        "carrier": "UPS",
        "totalSpend": SAMPLE_SPEND,
        "services": [
            {"type": "Ground", "weightRange": "1-5 lbs", "currentDiscount": "10%"},
            {"type": "Ground", "weightRange": "6-10 lbs", "currentDiscount": "12%"},
            {"type": "2nd Day Air", "weightRange": "1-10 lbs", "currentDiscount": "15%"},
            {"type": "2nd Day Air", "weightRange": "11-20 lbs", "currentDiscount": "18%"},
            {"type": "Next Day Air", "weightRange": "1-5 lbs", "currentDiscount": "20%"},
            {"type": "Next Day Air", "weightRange": "6-10 lbs", "currentDiscount": "22%"}
        ]
    })
}

/// Engine with default market table and a fixed signal
pub fn fixed_engine(score: u8) -> MetricsEngine {
    MetricsEngine::new(
        Arc::new(MarketConfig::default()),
        Box::new(FixedSignals::new(score, Trend::Up)),
    )
}

/// Every numeric field of every series, flattened in key order
pub fn numeric_fields(set: &ChartSeriesSet) -> Vec<f64> {
    set.iter()
        .flat_map(|(_, series)| series.iter())
        .flat_map(|record| record.iter().filter_map(|(_, v)| v.as_number()))
        .collect()
}

/// Assert two floats agree to `tolerance`
#[track_caller]
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}
