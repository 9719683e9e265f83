//! Static market tables
//!
//! Competitor benchmarks, historical rate indices, discount uplifts and the
//! opportunity catalogue are configuration, not contract data. They are
//! injected into derivation so the computation stays pure.

use crate::error::ConfigError;
use crate::opportunity::{default_opportunities, OpportunitySpec};
use cna_contract::{ServiceClass, DISCOUNT_RANGE};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Discount uplifts (percentage points) for one service class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Uplift {
    /// Added to the current discount for the recommended target
    pub recommended: f64,
    /// Added to the current discount for the industry average
    pub industry: f64,
}

impl Uplift {
    /// Recommended target for a current discount, capped at 100
    #[inline]
    #[must_use]
    pub fn recommended_for(&self, current: f64) -> f64 {
        (current + self.recommended).min(DISCOUNT_RANGE.1)
    }

    /// Industry average for a current discount, capped at 100
    #[inline]
    #[must_use]
    pub fn industry_for(&self, current: f64) -> f64 {
        (current + self.industry).min(DISCOUNT_RANGE.1)
    }
}

impl Default for Uplift {
    fn default() -> Self {
        Self {
            recommended: 5.0,
            industry: 2.0,
        }
    }
}

/// Static reference discount of a named competitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorBenchmark {
    pub name: String,
    pub discount: f64,
}

impl CompetitorBenchmark {
    /// Create new benchmark
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, discount: f64) -> Self {
        Self {
            name: name.into(),
            discount,
        }
    }
}

/// Rate index for one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub year: u16,
    /// Index of the contract's own carrier
    pub carrier_index: f64,
    /// Index per named competitor, in display order
    pub competitors: IndexMap<String, f64>,
}

/// Market configuration table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Uplift used for classes without an entry in `uplifts`
    pub default_uplift: Uplift,
    /// Per-class uplift overrides
    pub uplifts: BTreeMap<ServiceClass, Uplift>,
    /// Reference discount shown for the contract's carrier
    pub carrier_reference_discount: f64,
    /// Competitor benchmark table
    pub competitors: Vec<CompetitorBenchmark>,
    /// Potential spend as a fraction of current spend
    pub potential_spend_ratio: f64,
    /// Historical rate indices, oldest first
    pub historical: Vec<HistoricalPoint>,
    /// Named savings opportunities
    pub opportunities: Vec<OpportunitySpec>,
}

impl MarketConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With uplift for a class
    #[inline]
    #[must_use]
    pub fn with_uplift(mut self, class: ServiceClass, uplift: Uplift) -> Self {
        self.uplifts.insert(class, uplift);
        self
    }

    /// With competitor table
    #[inline]
    #[must_use]
    pub fn with_competitors(mut self, competitors: Vec<CompetitorBenchmark>) -> Self {
        self.competitors = competitors;
        self
    }

    /// With opportunity catalogue
    #[inline]
    #[must_use]
    pub fn with_opportunities(mut self, opportunities: Vec<OpportunitySpec>) -> Self {
        self.opportunities = opportunities;
        self
    }

    /// Uplift for a service class
    #[inline]
    #[must_use]
    pub fn uplift_for(&self, class: ServiceClass) -> Uplift {
        self.uplifts.get(&class).copied().unwrap_or(self.default_uplift)
    }

    /// Check table invariants
    ///
    /// # Errors
    /// `InvalidTable` describing the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        let uplifts = std::iter::once((None, &self.default_uplift))
            .chain(self.uplifts.iter().map(|(c, u)| (Some(*c), u)));
        for (class, uplift) in uplifts {
            let name = class.map_or("default".to_string(), |c| c.to_string());
            if !(uplift.recommended.is_finite() && uplift.industry.is_finite()) {
                return Err(ConfigError::InvalidTable(format!(
                    "uplift for {name} is not finite"
                )));
            }
            if uplift.industry >= uplift.recommended {
                return Err(ConfigError::InvalidTable(format!(
                    "industry uplift {} must be below recommended uplift {} ({name})",
                    uplift.industry, uplift.recommended
                )));
            }
        }

        if !(self.potential_spend_ratio.is_finite()
            && self.potential_spend_ratio > 0.0
            && self.potential_spend_ratio <= 1.0)
        {
            return Err(ConfigError::InvalidTable(format!(
                "potential spend ratio {} outside (0, 1]",
                self.potential_spend_ratio
            )));
        }

        if self.historical.windows(2).any(|w| w[0].year >= w[1].year) {
            return Err(ConfigError::InvalidTable(
                "historical years must be strictly increasing".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for opportunity in &self.opportunities {
            opportunity.check().map_err(ConfigError::InvalidTable)?;
            if !seen.insert(opportunity.id.as_str()) {
                return Err(ConfigError::InvalidTable(format!(
                    "duplicate opportunity id '{}'",
                    opportunity.id
                )));
            }
        }
        Ok(())
    }

    /// Parse from TOML string
    ///
    /// # Errors
    /// Parse failure or invalid table
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from YAML string
    ///
    /// # Errors
    /// Parse failure or invalid table
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml`, `.yaml` or `.yml` file
    ///
    /// # Errors
    /// IO failure, unsupported extension, parse failure or invalid table
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        let history = |year, carrier, fedex, dhl| HistoricalPoint {
            year,
            carrier_index: carrier,
            competitors: IndexMap::from([("FedEx".to_string(), fedex), ("DHL".to_string(), dhl)]),
        };

        Self {
            default_uplift: Uplift::default(),
            uplifts: BTreeMap::new(),
            carrier_reference_discount: 25.0,
            competitors: vec![
                CompetitorBenchmark::new("FedEx", 27.0),
                CompetitorBenchmark::new("DHL", 23.0),
                CompetitorBenchmark::new("USPS", 26.0),
            ],
            potential_spend_ratio: 0.9,
            historical: vec![
                history(2019, 100.0, 102.0, 98.0),
                history(2020, 103.0, 104.0, 101.0),
                history(2021, 105.0, 107.0, 104.0),
                history(2022, 108.0, 110.0, 107.0),
                history(2023, 112.0, 113.0, 110.0),
            ],
            opportunities: default_opportunities(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        MarketConfig::default().validate().unwrap();
    }

    #[test]
    fn uplift_override_per_class() {
        let config = MarketConfig::new().with_uplift(
            ServiceClass::NextDayAir,
            Uplift {
                recommended: 8.0,
                industry: 3.0,
            },
        );
        assert_eq!(config.uplift_for(ServiceClass::NextDayAir).recommended, 8.0);
        assert_eq!(config.uplift_for(ServiceClass::Ground).recommended, 5.0);
    }

    #[test]
    fn industry_uplift_must_stay_below_recommended() {
        let config = MarketConfig::new().with_uplift(
            ServiceClass::Ground,
            Uplift {
                recommended: 4.0,
                industry: 4.0,
            },
        );
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTable(_))));
    }

    #[test]
    fn toml_overrides_merge_with_defaults() {
        let config = MarketConfig::from_toml_str(
            r#"
            carrier_reference_discount = 21.5

            [[competitors]]
            name = "OnTrac"
            discount = 19.0

            [uplifts.ground]
            recommended = 7.0
            industry = 3.0
            "#,
        )
        .unwrap();

        assert_eq!(config.carrier_reference_discount, 21.5);
        assert_eq!(config.competitors, vec![CompetitorBenchmark::new("OnTrac", 19.0)]);
        assert_eq!(config.uplift_for(ServiceClass::Ground).recommended, 7.0);
        // untouched tables keep their defaults
        assert_eq!(config.historical.len(), 5);
    }

    #[test]
    fn yaml_table_parses() {
        let config = MarketConfig::from_yaml_str(
            "potential_spend_ratio: 0.85\nhistorical:\n  - year: 2024\n    carrier_index: 115\n    competitors:\n      FedEx: 116\n",
        )
        .unwrap();
        assert_eq!(config.potential_spend_ratio, 0.85);
        assert_eq!(config.historical[0].competitors["FedEx"], 116.0);
    }

    #[test]
    fn load_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "potential_spend_ratio = 0.8").unwrap();
        let config = MarketConfig::load(file.path()).unwrap();
        assert_eq!(config.potential_spend_ratio, 0.8);

        let other = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            MarketConfig::load(other.path()),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn duplicate_opportunity_ids_are_rejected() {
        let mut opportunities = default_opportunities();
        opportunities.push(opportunities[0].clone());
        let config = MarketConfig::new().with_opportunities(opportunities);
        assert!(config.validate().is_err());
    }
}
