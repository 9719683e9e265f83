//! Named negotiation opportunities and their savings estimates
//!
//! Savings are heuristics. Each opportunity assumes its own share of spend,
//! so the estimates do not add up to, or reconcile against, total spend.

use crate::signals::Trend;
use cna_contract::{ContractSnapshot, ServiceClass, ServiceTerm};
use serde::{Deserialize, Serialize};

/// How an opportunity's savings are estimated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SavingsFormula {
    /// `(target − current) × total_spend × assumed_share`
    ///
    /// `current` is the mean discount fraction of the snapshot's services in
    /// `class`, or `fallback_current_fraction` if the contract has none.
    RateGap {
        class: ServiceClass,
        target_fraction: f64,
        assumed_share: f64,
        fallback_current_fraction: f64,
    },
    /// `rate × total_spend`
    FlatRate { rate: f64 },
}

impl SavingsFormula {
    fn check(&self) -> Result<(), String> {
        let unit = |name: &str, v: f64| {
            if v.is_finite() && (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(format!("{name} {v} outside [0, 1]"))
            }
        };
        match self {
            Self::RateGap {
                target_fraction,
                assumed_share,
                fallback_current_fraction,
                ..
            } => {
                unit("target_fraction", *target_fraction)?;
                unit("assumed_share", *assumed_share)?;
                unit("fallback_current_fraction", *fallback_current_fraction)
            }
            Self::FlatRate { rate } => unit("rate", *rate),
        }
    }
}

/// Secondary amount shown with an opportunity (`total_spend × multiplier`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendReference {
    pub label: String,
    pub multiplier: f64,
}

/// Configured opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunitySpec {
    pub id: String,
    pub title: String,
    pub trend: Trend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor_insight: Option<String>,
    pub formula: SavingsFormula,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<SpendReference>,
}

impl OpportunitySpec {
    /// Check fractions and multipliers are sane
    ///
    /// # Errors
    /// Description of the first violation
    pub fn check(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("opportunity id is empty".to_string());
        }
        self.formula
            .check()
            .map_err(|e| format!("opportunity '{}': {e}", self.id))?;
        if let Some(reference) = &self.reference {
            if !reference.multiplier.is_finite() || reference.multiplier < 0.0 {
                return Err(format!(
                    "opportunity '{}': reference multiplier {} is negative or not finite",
                    self.id, reference.multiplier
                ));
            }
        }
        Ok(())
    }

    /// Evaluate against a validated snapshot
    #[must_use]
    pub fn evaluate(&self, snapshot: &ContractSnapshot) -> Opportunity {
        let spend = snapshot.total_spend();
        let (current, target, gap, savings) = match &self.formula {
            SavingsFormula::RateGap {
                class,
                target_fraction,
                assumed_share,
                fallback_current_fraction,
            } => {
                let current = class_mean_fraction(snapshot.services(), *class)
                    .unwrap_or(*fallback_current_fraction);
                let gap = target_fraction - current;
                let savings = (gap * spend * assumed_share).max(0.0);
                (Some(current), Some(*target_fraction), Some(gap), savings)
            }
            SavingsFormula::FlatRate { rate } => (None, None, None, rate * spend),
        };

        Opportunity {
            id: self.id.clone(),
            title: self.title.clone(),
            trend: self.trend,
            competitor_insight: self.competitor_insight.clone(),
            current_fraction: current,
            target_fraction: target,
            rate_gap: gap,
            potential_savings: savings,
            reference: self.reference.as_ref().map(|r| ReferenceAmount {
                label: r.label.clone(),
                amount: spend * r.multiplier,
            }),
        }
    }
}

/// Evaluated opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub trend: Trend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitor_insight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_fraction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_fraction: Option<f64>,
    /// `target - current`, signed; negative once the contract beats the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_gap: Option<f64>,
    /// Estimated annual savings; zero when already at or past target
    pub potential_savings: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceAmount>,
}

impl Opportunity {
    /// Whether a rate-gap opportunity is already met
    ///
    /// Always false for flat-rate opportunities.
    #[inline]
    #[must_use]
    pub fn is_at_or_above_target(&self) -> bool {
        self.rate_gap.is_some_and(|gap| gap <= 0.0)
    }
}

/// Evaluated [`SpendReference`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceAmount {
    pub label: String,
    pub amount: f64,
}

/// Mean discount fraction of services in a class
#[allow(clippy::cast_precision_loss)]
fn class_mean_fraction(services: &[ServiceTerm], class: ServiceClass) -> Option<f64> {
    let (sum, count) = services
        .iter()
        .filter(|s| s.class() == class)
        .fold((0.0, 0usize), |(sum, n), s| (sum + s.discount_fraction(), n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Opportunity catalogue used when no market table is supplied
#[must_use]
pub fn default_opportunities() -> Vec<OpportunitySpec> {
    vec![
        OpportunitySpec {
            id: "ground_rates".into(),
            title: "Optimize Ground Service Rates".into(),
            trend: Trend::Up,
            competitor_insight: Some(
                "FedEx offers 18% on Ground for comparable shipping profiles.".into(),
            ),
            formula: SavingsFormula::RateGap {
                class: ServiceClass::Ground,
                target_fraction: 0.18,
                assumed_share: 0.4,
                fallback_current_fraction: 0.11,
            },
            reference: None,
        },
        OpportunitySpec {
            id: "second_day_air".into(),
            title: "Enhance 2nd Day Air Discounts".into(),
            trend: Trend::Up,
            competitor_insight: Some(
                "DHL Express offers 24% on comparable 2-3 day services.".into(),
            ),
            formula: SavingsFormula::RateGap {
                class: ServiceClass::SecondDayAir,
                target_fraction: 0.245,
                assumed_share: 0.3,
                fallback_current_fraction: 0.165,
            },
            reference: None,
        },
        OpportunitySpec {
            id: "next_day_air".into(),
            title: "Maximize Next Day Air Value".into(),
            trend: Trend::Up,
            competitor_insight: Some(
                "USPS Priority Mail Express flat rates run up to 32% cheaper on some lanes.".into(),
            ),
            formula: SavingsFormula::RateGap {
                class: ServiceClass::NextDayAir,
                target_fraction: 0.285,
                assumed_share: 0.3,
                fallback_current_fraction: 0.21,
            },
            reference: None,
        },
        OpportunitySpec {
            id: "commitment_tiers".into(),
            title: "Implement Minimum Commitment Tiers".into(),
            trend: Trend::Up,
            competitor_insight: None,
            formula: SavingsFormula::FlatRate { rate: 0.025 },
            reference: Some(SpendReference {
                label: "minimum annual commitment".into(),
                multiplier: 1.1,
            }),
        },
        OpportunitySpec {
            id: "accessorial_charges".into(),
            title: "Negotiate Accessorial Charges".into(),
            trend: Trend::Down,
            competitor_insight: None,
            formula: SavingsFormula::FlatRate { rate: 0.05 },
            reference: None,
        },
        OpportunitySpec {
            id: "multi_carrier".into(),
            title: "Explore Multi-Carrier Strategy".into(),
            trend: Trend::Up,
            competitor_insight: Some(
                "FedEx and DHL are pricing aggressively to win share.".into(),
            ),
            formula: SavingsFormula::FlatRate { rate: 0.03 },
            reference: Some(SpendReference {
                label: "spend to shift to a secondary carrier".into(),
                multiplier: 0.25,
            }),
        },
    ]
}
