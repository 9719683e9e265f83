//! Chart-ready series
//!
//! Each series is an ordered list of flat records. Numeric fields are the
//! ones an animation may interpolate; text fields are labels and are only
//! ever replaced.

use crate::config::MarketConfig;
use cna_contract::{ContractError, ContractSnapshot, ServiceTerm};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Record field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric value, if any
    #[inline]
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// Text value, if any
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// One chart row, fields in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartRecord(IndexMap<String, FieldValue>);

impl ChartRecord {
    /// Create empty record
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With numeric field
    #[inline]
    #[must_use]
    pub fn with_number(mut self, key: impl Into<String>, value: f64) -> Self {
        self.0.insert(key.into(), FieldValue::Number(value));
        self
    }

    /// With text field
    #[inline]
    #[must_use]
    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), FieldValue::Text(value.into()));
        self
    }

    /// Set a field, keeping its position if it already exists
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.0.insert(key.into(), value);
    }

    /// Field by name
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    /// Numeric field by name
    #[inline]
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FieldValue::as_number)
    }

    /// Text field by name
    #[inline]
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_text)
    }

    /// Fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Has no fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for ChartRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Ordered records of one chart
pub type Series = Vec<ChartRecord>;

/// The five charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeriesKey {
    DiscountComparison,
    CompetitorComparison,
    SavingsComparison,
    ServiceBreakdown,
    HistoricalTrend,
}

impl SeriesKey {
    /// All keys, in display order
    pub const ALL: [SeriesKey; 5] = [
        SeriesKey::DiscountComparison,
        SeriesKey::CompetitorComparison,
        SeriesKey::SavingsComparison,
        SeriesKey::ServiceBreakdown,
        SeriesKey::HistoricalTrend,
    ];

    /// Stable identifier
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DiscountComparison => "discountComparison",
            Self::CompetitorComparison => "competitorComparison",
            Self::SavingsComparison => "savingsComparison",
            Self::ServiceBreakdown => "serviceBreakdown",
            Self::HistoricalTrend => "historicalTrend",
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All series keyed by chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartSeriesSet(BTreeMap<SeriesKey, Series>);

impl ChartSeriesSet {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Series for a chart
    #[inline]
    #[must_use]
    pub fn get(&self, key: SeriesKey) -> Option<&Series> {
        self.0.get(&key)
    }

    /// Replace series for a chart
    pub fn insert(&mut self, key: SeriesKey, series: Series) {
        self.0.insert(key, series);
    }

    /// Take the series out of the set
    pub fn remove(&mut self, key: SeriesKey) -> Option<Series> {
        self.0.remove(&key)
    }

    /// Series in key order
    pub fn iter(&self) -> impl Iterator<Item = (SeriesKey, &Series)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    /// Number of charts present
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No charts present
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(SeriesKey, Series)> for ChartSeriesSet {
    fn from_iter<I: IntoIterator<Item = (SeriesKey, Series)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Build all five series for a snapshot
///
/// # Errors
/// Same validation as metric derivation
pub fn build_series(
    snapshot: &ContractSnapshot,
    config: &MarketConfig,
) -> Result<ChartSeriesSet, ContractError> {
    snapshot.validate()?;

    let set: ChartSeriesSet = SeriesKey::ALL
        .into_iter()
        .map(|key| {
            let series = match key {
                SeriesKey::DiscountComparison => discount_comparison(snapshot, config),
                SeriesKey::CompetitorComparison => competitor_comparison(snapshot, config),
                SeriesKey::SavingsComparison => savings_comparison(snapshot, config),
                SeriesKey::ServiceBreakdown => service_breakdown(snapshot.services()),
                SeriesKey::HistoricalTrend => historical_trend(snapshot, config),
            };
            (key, series)
        })
        .collect();

    tracing::trace!(carrier = snapshot.carrier(), "Built chart series");
    Ok(set)
}

fn discount_comparison(snapshot: &ContractSnapshot, config: &MarketConfig) -> Series {
    snapshot
        .services()
        .iter()
        .map(|service| {
            let uplift = config.uplift_for(service.class());
            let current = service.current_discount_percent;
            ChartRecord::new()
                .with_text("name", service.label())
                .with_number("current", current)
                .with_number("recommended", uplift.recommended_for(current))
                .with_number("industry", uplift.industry_for(current))
        })
        .collect()
}

fn competitor_comparison(snapshot: &ContractSnapshot, config: &MarketConfig) -> Series {
    std::iter::once(
        ChartRecord::new()
            .with_text("name", snapshot.carrier())
            .with_number("discount", config.carrier_reference_discount),
    )
    .chain(config.competitors.iter().map(|c| {
        ChartRecord::new()
            .with_text("name", c.name.as_str())
            .with_number("discount", c.discount)
    }))
    .collect()
}

fn savings_comparison(snapshot: &ContractSnapshot, config: &MarketConfig) -> Series {
    let spend = snapshot.total_spend();
    vec![
        ChartRecord::new()
            .with_text("name", "Current Spend")
            .with_number("amount", spend),
        ChartRecord::new()
            .with_text("name", "Potential Spend")
            .with_number("amount", spend * config.potential_spend_ratio),
    ]
}

/// Spend-weighted when every line carries a spend and the total is positive,
/// equal shares otherwise
#[allow(clippy::cast_precision_loss)]
fn service_breakdown(services: &[ServiceTerm]) -> Series {
    let spends: Option<Vec<f64>> = services.iter().map(|s| s.annual_spend).collect();
    let weights = match spends {
        Some(spends) if spends.iter().sum::<f64>() > 0.0 => {
            let total: f64 = spends.iter().sum();
            spends.into_iter().map(|s| 100.0 * s / total).collect()
        }
        _ => vec![100.0 / services.len() as f64; services.len()],
    };

    services
        .iter()
        .zip(weights)
        .map(|(service, value)| {
            ChartRecord::new()
                .with_text("name", service.label())
                .with_number("value", value)
        })
        .collect()
}

/// Label column of the historical trend
const YEAR_FIELD: &str = "year";

/// A carrier literally named like the label column gets a suffixed column;
/// such competitors are left out.
fn historical_trend(snapshot: &ContractSnapshot, config: &MarketConfig) -> Series {
    let carrier = snapshot.carrier();
    let carrier_column = if carrier == YEAR_FIELD {
        format!("{carrier} (carrier)")
    } else {
        carrier.to_string()
    };
    config
        .historical
        .iter()
        .map(|point| {
            let mut record = ChartRecord::new()
                .with_text(YEAR_FIELD, point.year.to_string())
                .with_number(carrier_column.as_str(), point.carrier_index);
            for (name, index) in &point.competitors {
                if name != carrier && name != YEAR_FIELD && *name != carrier_column {
                    record.insert(name.as_str(), FieldValue::Number(*index));
                }
            }
            record
        })
        .collect()
}
