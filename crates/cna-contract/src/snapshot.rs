//! Immutable contract snapshots
//!
//! A [`ContractSnapshot`] is never modified after it is published. The store
//! builds a fresh snapshot for every edit and hands it out behind an `Arc`,
//! so consumers may keep older snapshots around safely.

use crate::error::ContractError;
use crate::service::ServiceTerm;
use serde::{Deserialize, Serialize};

/// Top-level fields of an uploaded record
pub const RECORD_FIELD_COUNT: usize = 4;

/// One published version of the contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ContractUpload", rename_all = "camelCase")]
pub struct ContractSnapshot {
    carrier: String,
    total_spend: f64,
    base_spend: f64,
    services: Vec<ServiceTerm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

/// Shape of a contract as delivered by the ingestion collaborator
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractUpload {
    carrier: String,
    total_spend: f64,
    services: Vec<ServiceTerm>,
    #[serde(default)]
    context: Option<String>,
    /// Present when a published snapshot is read back
    #[serde(default)]
    base_spend: Option<f64>,
}

impl From<ContractUpload> for ContractSnapshot {
    fn from(upload: ContractUpload) -> Self {
        let mut snapshot = Self::new(upload.carrier, upload.total_spend, upload.services)
            .with_context(upload.context);
        if let Some(base) = upload.base_spend {
            snapshot.base_spend = base;
        }
        snapshot
    }
}

impl ContractSnapshot {
    /// Create snapshot as uploaded (base spend = total spend)
    ///
    /// No validation happens here; see [`ContractSnapshot::validate`].
    #[inline]
    #[must_use]
    pub fn new(carrier: impl Into<String>, total_spend: f64, services: Vec<ServiceTerm>) -> Self {
        Self {
            carrier: carrier.into(),
            total_spend,
            base_spend: total_spend,
            services,
            context: None,
        }
    }

    /// With negotiation context
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    /// Carrier name
    #[inline]
    #[must_use]
    pub fn carrier(&self) -> &str {
        &self.carrier
    }

    /// Current total spend
    #[inline]
    #[must_use]
    pub fn total_spend(&self) -> f64 {
        self.total_spend
    }

    /// Spend supplied at upload time
    #[inline]
    #[must_use]
    pub fn base_spend(&self) -> f64 {
        self.base_spend
    }

    /// Service lines in editor order
    #[inline]
    #[must_use]
    pub fn services(&self) -> &[ServiceTerm] {
        &self.services
    }

    /// Free-text negotiation context
    #[inline]
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Number of top-level fields on the record
    ///
    /// Carrier, spend, services and context. Context is part of every
    /// record from upload on, even when left empty.
    #[inline]
    #[must_use]
    pub fn populated_field_count(&self) -> usize {
        RECORD_FIELD_COUNT
    }

    /// Check the snapshot can be derived from
    ///
    /// # Errors
    /// - `InvalidContract` for non-positive or non-finite spend, or a discount
    ///   outside `[0, 100]`
    /// - `Derivation` for an empty service list
    pub fn validate(&self) -> Result<(), ContractError> {
        validate_spend(self.total_spend)?;
        for (index, service) in self.services.iter().enumerate() {
            service.validate(index)?;
        }
        if self.services.is_empty() {
            return Err(ContractError::Derivation(
                "contract has no services".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn set_carrier(&mut self, carrier: String) {
        self.carrier = carrier;
    }

    pub(crate) fn set_total_spend(&mut self, spend: f64) {
        self.total_spend = spend;
    }

    pub(crate) fn set_context(&mut self, context: Option<String>) {
        self.context = context;
    }

    pub(crate) fn services_mut(&mut self) -> &mut Vec<ServiceTerm> {
        &mut self.services
    }
}

/// Reject non-positive or non-finite spend
///
/// # Errors
/// `InvalidContract` describing the value
pub fn validate_spend(spend: f64) -> Result<(), ContractError> {
    if spend.is_finite() && spend > 0.0 {
        Ok(())
    } else {
        Err(ContractError::InvalidContract(format!(
            "total spend must be positive, got {spend}"
        )))
    }
}

/// Unweighted mean of all service discount fractions
///
/// # Errors
/// `Derivation` when `services` is empty (the mean is undefined)
#[allow(clippy::cast_precision_loss)]
pub fn mean_discount_fraction(services: &[ServiceTerm]) -> Result<f64, ContractError> {
    if services.is_empty() {
        return Err(ContractError::Derivation(
            "average discount is undefined for an empty service list".to_string(),
        ));
    }
    let total: f64 = services.iter().map(ServiceTerm::discount_fraction).sum();
    Ok(total / services.len() as f64)
}

/// `base_spend × (1 − mean discount fraction)`
///
/// # Errors
/// `Derivation` when `services` is empty
pub fn recompute_total_spend(base_spend: f64, services: &[ServiceTerm]) -> Result<f64, ContractError> {
    Ok(base_spend * (1.0 - mean_discount_fraction(services)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ground(discount: f64) -> ServiceTerm {
        ServiceTerm::new("Ground", "1-5 lbs", discount)
    }

    #[test]
    fn mean_of_empty_is_derivation_error() {
        let err = mean_discount_fraction(&[]).unwrap_err();
        assert!(err.is_derivation());
    }

    #[test]
    fn recompute_uses_unweighted_mean() {
        let services = vec![ground(10.0), ground(20.0)];
        let spend = recompute_total_spend(1_000_000.0, &services).unwrap();
        assert!((spend - 850_000.0).abs() < 1e-9);
    }

    #[test]
    fn validate_checks_spend_then_discounts_then_emptiness() {
        let snap = ContractSnapshot::new("UPS", 0.0, vec![]);
        assert!(snap.validate().unwrap_err().is_invalid_contract());

        let snap = ContractSnapshot::new("UPS", 10.0, vec![ground(101.0)]);
        assert!(snap.validate().unwrap_err().is_invalid_contract());

        let snap = ContractSnapshot::new("UPS", 10.0, vec![]);
        assert!(snap.validate().unwrap_err().is_derivation());

        let snap = ContractSnapshot::new("UPS", 10.0, vec![ground(10.0)]);
        assert!(snap.validate().is_ok());
    }

    #[test]
    fn deserialize_upload_sets_base_spend() {
        let snap: ContractSnapshot = serde_json::from_value(json!({
            "carrier": "UPS",
            "totalSpend": 5_750_000.0,
            "services": [
                {"type": "Ground", "weightRange": "1-5 lbs", "currentDiscount": "10%"}
            ],
            "context": "renewal due in Q3"
        }))
        .unwrap();

        assert_eq!(snap.carrier(), "UPS");
        assert_eq!(snap.base_spend(), 5_750_000.0);
        assert_eq!(snap.context(), Some("renewal due in Q3"));
        assert_eq!(snap.populated_field_count(), 4);
    }

    #[test]
    fn context_field_counts_even_when_empty() {
        let snap = ContractSnapshot::new("UPS", 10.0, vec![ground(10.0)]);
        assert_eq!(snap.context(), None);
        assert_eq!(snap.populated_field_count(), RECORD_FIELD_COUNT);
    }

    #[test]
    fn serialized_snapshot_keeps_base_spend() {
        let mut snap = ContractSnapshot::new("UPS", 1_000_000.0, vec![ground(10.0), ground(20.0)]);
        snap.set_total_spend(850_000.0);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["baseSpend"], 1_000_000.0);

        let back: ContractSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back.base_spend(), 1_000_000.0);
        assert_eq!(back.total_spend(), 850_000.0);
        assert_eq!(back, snap);
    }
}
