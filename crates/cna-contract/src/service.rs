//! Service terms
//!
//! A [`ServiceTerm`] is one row of the contract's service table. Identity is
//! positional: there is no ID, so the index within the snapshot is the key.

use crate::error::ContractError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inclusive bounds for a discount percentage
pub const DISCOUNT_RANGE: (f64, f64) = (0.0, 100.0);

/// One negotiated service line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTerm {
    /// Carrier service name ("Ground", "2nd Day Air", ...)
    #[serde(rename = "type")]
    pub service_type: String,

    /// Weight bracket label ("1-5 lbs")
    #[serde(rename = "weightRange")]
    pub weight_range: String,

    /// Current discount in percent, `[0, 100]`
    #[serde(rename = "currentDiscount", deserialize_with = "deserialize_discount")]
    pub current_discount_percent: f64,

    /// Annual spend on this line, when the upload carries it
    #[serde(
        rename = "annualSpend",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub annual_spend: Option<f64>,
}

impl ServiceTerm {
    /// Create new service term
    #[inline]
    #[must_use]
    pub fn new(
        service_type: impl Into<String>,
        weight_range: impl Into<String>,
        current_discount_percent: f64,
    ) -> Self {
        Self {
            service_type: service_type.into(),
            weight_range: weight_range.into(),
            current_discount_percent,
            annual_spend: None,
        }
    }

    /// Blank row appended by the editor
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::new("", "", 0.0)
    }

    /// With annual spend
    #[inline]
    #[must_use]
    pub fn with_annual_spend(mut self, spend: f64) -> Self {
        self.annual_spend = Some(spend);
        self
    }

    /// Discount as a fraction in `[0, 1]`
    #[inline]
    #[must_use]
    pub fn discount_fraction(&self) -> f64 {
        self.current_discount_percent / 100.0
    }

    /// Service class derived from the service name
    #[inline]
    #[must_use]
    pub fn class(&self) -> ServiceClass {
        ServiceClass::classify(&self.service_type)
    }

    /// Chart label, `"<type> (<weight range>)"`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.service_type, self.weight_range)
    }

    /// Check the discount is a finite percentage within bounds
    ///
    /// # Errors
    /// `InvalidContract` naming the offending row
    pub fn validate(&self, index: usize) -> Result<(), ContractError> {
        let d = self.current_discount_percent;
        if !d.is_finite() || d < DISCOUNT_RANGE.0 || d > DISCOUNT_RANGE.1 {
            return Err(ContractError::InvalidContract(format!(
                "service {index} ('{}') discount {d} outside [0, 100]",
                self.service_type
            )));
        }
        if let Some(spend) = self.annual_spend {
            if !spend.is_finite() || spend < 0.0 {
                return Err(ContractError::InvalidContract(format!(
                    "service {index} ('{}') annual spend {spend} is negative or not finite",
                    self.service_type
                )));
            }
        }
        Ok(())
    }
}

/// Product tier a service belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceClass {
    /// Ground shipping
    Ground,
    /// Two-day air
    SecondDayAir,
    /// Overnight air
    NextDayAir,
    /// Anything unrecognised
    Other,
}

impl ServiceClass {
    /// All classes, in display order
    pub const ALL: [ServiceClass; 4] = [
        ServiceClass::Ground,
        ServiceClass::SecondDayAir,
        ServiceClass::NextDayAir,
        ServiceClass::Other,
    ];

    /// Classify a free-text service name
    #[must_use]
    pub fn classify(service_type: &str) -> Self {
        let name = service_type.to_ascii_lowercase();
        if name.contains("ground") {
            Self::Ground
        } else if name.contains("2nd day") || name.contains("second day") || name.contains("2 day")
        {
            Self::SecondDayAir
        } else if name.contains("next day") || name.contains("overnight") {
            Self::NextDayAir
        } else {
            Self::Other
        }
    }

    /// Human-readable name
    #[inline]
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ground => "Ground",
            Self::SecondDayAir => "2nd Day Air",
            Self::NextDayAir => "Next Day Air",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Editable column of a service row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceField {
    /// `type`
    ServiceType,
    /// `weightRange`
    WeightRange,
    /// `currentDiscount`
    CurrentDiscount,
}

impl ServiceField {
    /// Wire name used by the editor
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceType => "type",
            Self::WeightRange => "weightRange",
            Self::CurrentDiscount => "currentDiscount",
        }
    }
}

impl FromStr for ServiceField {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type" => Ok(Self::ServiceType),
            "weightRange" => Ok(Self::WeightRange),
            "currentDiscount" => Ok(Self::CurrentDiscount),
            other => Err(ContractError::UnknownField(format!("services.{other}"))),
        }
    }
}

impl fmt::Display for ServiceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a discount typed as text (`"10%"`, `" 12.5 "`, `""`)
///
/// A blank input is an unset discount and reads as `0`.
///
/// # Errors
/// `InvalidContract` if the text is not a number or falls outside `[0, 100]`
pub fn parse_discount_percent(input: &str) -> Result<f64, ContractError> {
    let trimmed = input.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    if number.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = number.parse().map_err(|_| {
        ContractError::InvalidContract(format!("discount '{input}' is not a number"))
    })?;
    if !value.is_finite() || value < DISCOUNT_RANGE.0 || value > DISCOUNT_RANGE.1 {
        return Err(ContractError::InvalidContract(format!(
            "discount '{input}' outside [0, 100]"
        )));
    }
    Ok(value)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDiscount {
    Number(f64),
    Text(String),
}

fn deserialize_discount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawDiscount::deserialize(deserializer)? {
        RawDiscount::Number(n) => Ok(n),
        RawDiscount::Text(s) => parse_discount_percent(&s).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_discount_variants() {
        assert_eq!(parse_discount_percent("10%").unwrap(), 10.0);
        assert_eq!(parse_discount_percent(" 12.5 ").unwrap(), 12.5);
        assert_eq!(parse_discount_percent("18 %").unwrap(), 18.0);
        assert_eq!(parse_discount_percent("").unwrap(), 0.0);
        assert!(parse_discount_percent("abc").is_err());
        assert!(parse_discount_percent("120%").is_err());
        assert!(parse_discount_percent("-1").is_err());
    }

    #[test]
    fn deserialize_editor_row() {
        let row: ServiceTerm = serde_json::from_value(json!({
            "type": "Ground",
            "weightRange": "1-5 lbs",
            "currentDiscount": "10%"
        }))
        .unwrap();
        assert_eq!(row, ServiceTerm::new("Ground", "1-5 lbs", 10.0));

        let row: ServiceTerm = serde_json::from_value(json!({
            "type": "Next Day Air",
            "weightRange": "6-10 lbs",
            "currentDiscount": 22,
            "annualSpend": 125000.0
        }))
        .unwrap();
        assert_eq!(row.annual_spend, Some(125_000.0));
    }

    #[test]
    fn deserialize_rejects_bad_discount_text() {
        let result: Result<ServiceTerm, _> = serde_json::from_value(json!({
            "type": "Ground",
            "weightRange": "1-5 lbs",
            "currentDiscount": "lots"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn classify_service_names() {
        assert_eq!(ServiceClass::classify("Ground"), ServiceClass::Ground);
        assert_eq!(ServiceClass::classify("UPS Ground Saver"), ServiceClass::Ground);
        assert_eq!(ServiceClass::classify("2nd Day Air"), ServiceClass::SecondDayAir);
        assert_eq!(ServiceClass::classify("Next Day Air"), ServiceClass::NextDayAir);
        assert_eq!(ServiceClass::classify("Freight"), ServiceClass::Other);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        assert!(ServiceTerm::new("Ground", "1-5 lbs", 100.0).validate(0).is_ok());
        assert!(ServiceTerm::new("Ground", "1-5 lbs", 100.5).validate(0).is_err());
        assert!(ServiceTerm::new("Ground", "1-5 lbs", f64::NAN).validate(0).is_err());
        assert!(ServiceTerm::new("Ground", "1-5 lbs", 5.0)
            .with_annual_spend(-1.0)
            .validate(0)
            .is_err());
    }

    #[test]
    fn service_field_names() {
        assert_eq!("weightRange".parse::<ServiceField>().unwrap(), ServiceField::WeightRange);
        assert!("discount".parse::<ServiceField>().is_err());
        assert_eq!(ServiceField::CurrentDiscount.to_string(), "currentDiscount");
    }

    #[test]
    fn label_format() {
        assert_eq!(ServiceTerm::new("Ground", "1-5 lbs", 10.0).label(), "Ground (1-5 lbs)");
    }
}
