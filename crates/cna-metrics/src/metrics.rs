//! Metric derivation
//!
//! [`derive_metrics`] is a pure function of the snapshot, the market table and
//! one flexibility signal. [`MetricsEngine`] pairs it with a
//! [`SignalProvider`] so callers do not thread signals by hand.

use crate::config::{CompetitorBenchmark, MarketConfig};
use crate::opportunity::Opportunity;
use crate::signals::{FlexibilityScore, FlexibilitySignal, SignalProvider, Trend};
use cna_contract::{ContractError, ContractSnapshot, ServiceClass};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Percentage of progress credited per populated contract field
pub const PROGRESS_PER_FIELD: u8 = 15;

/// Risk of the negotiation stalling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify a flexibility score
    #[inline]
    #[must_use]
    pub fn from_score(score: FlexibilityScore) -> Self {
        match score.value() {
            s if s > 75 => Self::Low,
            s if s > 60 => Self::Medium,
            _ => Self::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Qualitative reading of the flexibility score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlexibilityBand {
    Strong,
    Moderate,
    Weak,
}

impl FlexibilityBand {
    /// Band for a score
    #[inline]
    #[must_use]
    pub fn from_score(score: FlexibilityScore) -> Self {
        match score.value() {
            s if s > 80 => Self::Strong,
            s if s > 60 => Self::Moderate,
            _ => Self::Weak,
        }
    }
}

/// Vendor flexibility as presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorFlexibility {
    pub score: FlexibilityScore,
    pub trend: Trend,
    pub band: FlexibilityBand,
}

impl From<FlexibilitySignal> for VendorFlexibility {
    fn from(signal: FlexibilitySignal) -> Self {
        Self {
            score: signal.score,
            trend: signal.trend,
            band: FlexibilityBand::from_score(signal.score),
        }
    }
}

/// Negotiation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    Negotiating,
    Finalized,
}

/// Negotiation progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationProgress {
    /// Always within `[0, 100]`
    pub percent: u8,
    pub status: NegotiationStatus,
}

impl NegotiationProgress {
    /// Progress from the number of populated contract fields
    #[must_use]
    pub fn from_populated_fields(fields: usize) -> Self {
        let percent = u8::try_from(fields)
            .ok()
            .and_then(|n| n.checked_mul(PROGRESS_PER_FIELD))
            .map_or(100, |p| p.min(100));
        let status = if percent >= 100 {
            NegotiationStatus::Finalized
        } else {
            NegotiationStatus::Negotiating
        };
        Self { percent, status }
    }
}

/// Discount targets for one service line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecommendation {
    /// `"<type> (<weight>)"`
    pub name: String,
    pub class: ServiceClass,
    pub current_discount: f64,
    pub recommended_discount: f64,
    pub industry_average: f64,
}

/// Everything derived from one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub carrier: String,
    pub total_spend: f64,
    pub services: Vec<ServiceRecommendation>,
    /// Carrier reference row first, then the configured competitors
    pub competitors: Vec<CompetitorBenchmark>,
    pub opportunities: Vec<Opportunity>,
    pub total_potential_savings: f64,
    pub potential_spend: f64,
    pub flexibility: VendorFlexibility,
    pub risk: RiskLevel,
    pub progress: NegotiationProgress,
}

/// Derive metrics from a snapshot
///
/// # Errors
/// - `InvalidContract` for non-positive spend or an out-of-range discount
/// - `Derivation` for an empty service list
pub fn derive_metrics(
    snapshot: &ContractSnapshot,
    config: &MarketConfig,
    signal: FlexibilitySignal,
) -> Result<DerivedMetrics, ContractError> {
    snapshot.validate()?;

    let services = snapshot
        .services()
        .iter()
        .map(|service| {
            let class = service.class();
            let uplift = config.uplift_for(class);
            let current = service.current_discount_percent;
            ServiceRecommendation {
                name: service.label(),
                class,
                current_discount: current,
                recommended_discount: uplift.recommended_for(current),
                industry_average: uplift.industry_for(current),
            }
        })
        .collect();

    let competitors = std::iter::once(CompetitorBenchmark::new(
        snapshot.carrier(),
        config.carrier_reference_discount,
    ))
    .chain(config.competitors.iter().cloned())
    .collect();

    let opportunities: Vec<Opportunity> = config
        .opportunities
        .iter()
        .map(|spec| spec.evaluate(snapshot))
        .collect();
    let total_potential_savings = opportunities.iter().map(|o| o.potential_savings).sum();

    let metrics = DerivedMetrics {
        carrier: snapshot.carrier().to_string(),
        total_spend: snapshot.total_spend(),
        services,
        competitors,
        opportunities,
        total_potential_savings,
        potential_spend: snapshot.total_spend() * config.potential_spend_ratio,
        flexibility: signal.into(),
        risk: RiskLevel::from_score(signal.score),
        progress: NegotiationProgress::from_populated_fields(snapshot.populated_field_count()),
    };

    tracing::debug!(
        carrier = %metrics.carrier,
        services = metrics.services.len(),
        score = signal.score.value(),
        risk = %metrics.risk,
        "Derived contract metrics"
    );
    Ok(metrics)
}

/// Stateful derivation front end drawing one signal per call
pub struct MetricsEngine {
    config: Arc<MarketConfig>,
    signals: Box<dyn SignalProvider>,
}

impl MetricsEngine {
    /// Create new engine
    #[must_use]
    pub fn new(config: Arc<MarketConfig>, signals: Box<dyn SignalProvider>) -> Self {
        Self { config, signals }
    }

    /// Market table in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Arc<MarketConfig> {
        &self.config
    }

    /// Derive metrics, drawing a fresh flexibility signal
    ///
    /// # Errors
    /// See [`derive_metrics`]
    pub fn derive(&mut self, snapshot: &ContractSnapshot) -> Result<DerivedMetrics, ContractError> {
        // validate before drawing so rejected snapshots do not advance the provider
        snapshot.validate()?;
        let signal = self.signals.next_signal();
        derive_metrics(snapshot, &self.config, signal)
    }
}

impl fmt::Debug for MetricsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{FixedSignals, MockSignalProvider};
    use cna_contract::ServiceTerm;

    fn signal(score: u8) -> FlexibilitySignal {
        FlexibilitySignal::new(FlexibilityScore::clamped(score), Trend::Up)
    }

    fn ups() -> ContractSnapshot {
        ContractSnapshot::new(
            "UPS",
            5_000_000.0,
            vec![ServiceTerm::new("Ground", "1-5lbs", 10.0)],
        )
    }

    #[test]
    fn risk_thresholds() {
        let risk = |s| RiskLevel::from_score(FlexibilityScore::clamped(s));
        assert_eq!(risk(60), RiskLevel::High);
        assert_eq!(risk(61), RiskLevel::Medium);
        assert_eq!(risk(75), RiskLevel::Medium);
        assert_eq!(risk(76), RiskLevel::Low);
        assert_eq!(risk(90), RiskLevel::Low);
    }

    #[test]
    fn band_thresholds() {
        let band = |s| FlexibilityBand::from_score(FlexibilityScore::clamped(s));
        assert_eq!(band(60), FlexibilityBand::Weak);
        assert_eq!(band(80), FlexibilityBand::Moderate);
        assert_eq!(band(81), FlexibilityBand::Strong);
    }

    #[test]
    fn progress_caps_at_one_hundred() {
        let p = NegotiationProgress::from_populated_fields(3);
        assert_eq!(p.percent, 45);
        assert_eq!(p.status, NegotiationStatus::Negotiating);

        let p = NegotiationProgress::from_populated_fields(7);
        assert_eq!(p.percent, 100);
        assert_eq!(p.status, NegotiationStatus::Finalized);

        assert_eq!(NegotiationProgress::from_populated_fields(usize::MAX).percent, 100);
    }

    #[test]
    fn ups_ground_scenario() {
        let metrics = derive_metrics(&ups(), &MarketConfig::default(), signal(70)).unwrap();

        let ground = &metrics.services[0];
        assert_eq!(ground.name, "Ground (1-5lbs)");
        assert_eq!(ground.recommended_discount, 15.0);
        assert_eq!(ground.industry_average, 12.0);

        let savings = metrics
            .opportunities
            .iter()
            .find(|o| o.id == "ground_rates")
            .unwrap()
            .potential_savings;
        // (0.18 - 0.10) * 5_000_000 * 0.4
        assert!((savings - 160_000.0).abs() < 1e-6);
        assert_eq!(metrics.risk, RiskLevel::Medium);
        assert_eq!(metrics.competitors[0], CompetitorBenchmark::new("UPS", 25.0));
    }

    #[test]
    fn recommended_discount_is_capped() {
        let snap = ContractSnapshot::new("UPS", 10.0, vec![ServiceTerm::new("Ground", "", 98.0)]);
        let metrics = derive_metrics(&snap, &MarketConfig::default(), signal(70)).unwrap();
        assert_eq!(metrics.services[0].recommended_discount, 100.0);
        assert_eq!(metrics.services[0].industry_average, 100.0);
    }

    #[test]
    fn invalid_snapshots_are_rejected() {
        let config = MarketConfig::default();
        let empty = ContractSnapshot::new("UPS", 10.0, vec![]);
        assert!(derive_metrics(&empty, &config, signal(70))
            .unwrap_err()
            .is_derivation());

        let negative = ContractSnapshot::new("UPS", -1.0, vec![ServiceTerm::new("Ground", "", 1.0)]);
        assert!(derive_metrics(&negative, &config, signal(70))
            .unwrap_err()
            .is_invalid_contract());
    }

    #[test]
    fn engine_is_deterministic_with_fixed_signal() {
        let mut engine = MetricsEngine::new(
            Arc::new(MarketConfig::default()),
            Box::new(FixedSignals::new(82, Trend::Down)),
        );
        let a = engine.derive(&ups()).unwrap();
        let b = engine.derive(&ups()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.flexibility.band, FlexibilityBand::Strong);
    }

    #[test]
    fn engine_draws_one_signal_per_valid_derivation() {
        let mut provider = MockSignalProvider::new();
        provider
            .expect_next_signal()
            .times(1)
            .returning(|| FlexibilitySignal::new(FlexibilityScore::clamped(60), Trend::Down));

        let mut engine = MetricsEngine::new(Arc::new(MarketConfig::default()), Box::new(provider));
        let metrics = engine.derive(&ups()).unwrap();
        assert_eq!(metrics.risk, RiskLevel::High);

        let empty = ContractSnapshot::new("UPS", 10.0, vec![]);
        assert!(engine.derive(&empty).is_err());
    }
}
