//! Contract record store
//!
//! Holds the current [`ContractSnapshot`] and applies field-level edits.
//!
//! # Invariants
//! - Every accepted edit publishes a new `Arc<ContractSnapshot>`; published
//!   snapshots are never mutated.
//! - Whenever the service list changes, total spend is recomputed as
//!   `base_spend × (1 − mean discount fraction)`.
//! - A rejected edit leaves the current snapshot untouched.

use crate::error::ContractError;
use crate::service::{parse_discount_percent, ServiceField, ServiceTerm};
use crate::snapshot::{recompute_total_spend, validate_spend, ContractSnapshot};
use serde_json::Value;
use std::sync::Arc;

/// Field names accepted by [`ContractStore::apply_edit`]
pub mod fields {
    /// Carrier name
    pub const CARRIER: &str = "carrier";
    /// Total spend
    pub const TOTAL_SPEND: &str = "totalSpend";
    /// Whole service list
    pub const SERVICES: &str = "services";
    /// Negotiation context
    pub const CONTEXT: &str = "context";
}

/// Typed contract edit
#[derive(Debug, Clone, PartialEq)]
pub enum ContractEdit {
    /// Replace the carrier name
    SetCarrier(String),
    /// Replace total spend
    SetTotalSpend(f64),
    /// Replace or clear the negotiation context
    SetContext(Option<String>),
    /// Replace the whole service list
    ReplaceServices(Vec<ServiceTerm>),
    /// Append a blank service row
    AppendService,
    /// Remove the service at an index
    RemoveService(usize),
    /// Set one column of the service at an index
    SetServiceField {
        index: usize,
        field: ServiceField,
        value: String,
    },
}

impl ContractEdit {
    /// Whether this edit changes the service list
    #[inline]
    #[must_use]
    pub fn touches_services(&self) -> bool {
        matches!(
            self,
            Self::ReplaceServices(_)
                | Self::AppendService
                | Self::RemoveService(_)
                | Self::SetServiceField { .. }
        )
    }

    /// Short name for logging
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetCarrier(_) => "set_carrier",
            Self::SetTotalSpend(_) => "set_total_spend",
            Self::SetContext(_) => "set_context",
            Self::ReplaceServices(_) => "replace_services",
            Self::AppendService => "append_service",
            Self::RemoveService(_) => "remove_service",
            Self::SetServiceField { .. } => "set_service_field",
        }
    }

    /// Decode a string-keyed editor edit
    ///
    /// # Errors
    /// - `UnknownField` for names other than `carrier`, `totalSpend`,
    ///   `services`, `context`
    /// - `InvalidValue` when the JSON value has the wrong shape
    pub fn from_field(field: &str, value: Value) -> Result<Self, ContractError> {
        match field {
            fields::CARRIER => match value {
                Value::String(s) => Ok(Self::SetCarrier(s)),
                other => Err(ContractError::invalid_value(
                    field,
                    format!("expected string, got {other}"),
                )),
            },
            fields::TOTAL_SPEND => {
                let spend = match &value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                spend.map(Self::SetTotalSpend).ok_or_else(|| {
                    ContractError::invalid_value(field, format!("expected number, got {value}"))
                })
            }
            fields::SERVICES => serde_json::from_value::<Vec<ServiceTerm>>(value)
                .map(Self::ReplaceServices)
                .map_err(|e| ContractError::invalid_value(field, e.to_string())),
            fields::CONTEXT => match value {
                Value::Null => Ok(Self::SetContext(None)),
                Value::String(s) => Ok(Self::SetContext(Some(s))),
                other => Err(ContractError::invalid_value(
                    field,
                    format!("expected string or null, got {other}"),
                )),
            },
            other => Err(ContractError::UnknownField(other.to_string())),
        }
    }
}

/// Store holding the current contract snapshot
#[derive(Debug, Clone)]
pub struct ContractStore {
    current: Arc<ContractSnapshot>,
    revision: u64,
}

impl ContractStore {
    /// Open a store on an uploaded snapshot
    ///
    /// The snapshot is published as delivered; total spend is recomputed on
    /// the first service edit.
    ///
    /// # Errors
    /// Any validation failure of the upload (see [`ContractSnapshot::validate`])
    pub fn open(snapshot: ContractSnapshot) -> Result<Self, ContractError> {
        snapshot.validate()?;
        tracing::info!(
            carrier = snapshot.carrier(),
            services = snapshot.services().len(),
            total_spend = snapshot.total_spend(),
            "contract opened"
        );
        Ok(Self {
            current: Arc::new(snapshot),
            revision: 0,
        })
    }

    /// Current snapshot
    #[inline]
    #[must_use]
    pub fn current(&self) -> Arc<ContractSnapshot> {
        Arc::clone(&self.current)
    }

    /// Number of edits accepted since upload
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a string-keyed edit from the editor
    ///
    /// # Errors
    /// See [`ContractEdit::from_field`] and [`ContractStore::apply`]
    pub fn apply_edit(
        &mut self,
        field: &str,
        value: Value,
    ) -> Result<Arc<ContractSnapshot>, ContractError> {
        let edit = ContractEdit::from_field(field, value).map_err(|e| {
            tracing::warn!(field, error = %e, "edit rejected");
            e
        })?;
        self.apply(edit)
    }

    /// Apply a typed edit and publish the resulting snapshot
    ///
    /// # Errors
    /// - `InvalidContract` for non-positive spend or out-of-range discounts
    /// - `Derivation` when the service list would become empty
    /// - `IndexOutOfRange` for positional edits past the end of the list
    pub fn apply(&mut self, edit: ContractEdit) -> Result<Arc<ContractSnapshot>, ContractError> {
        let kind = edit.kind();
        let next = self.build_next(edit).map_err(|e| {
            tracing::warn!(edit = kind, error = %e, "edit rejected");
            e
        })?;

        self.current = Arc::new(next);
        self.revision += 1;
        tracing::debug!(
            edit = kind,
            revision = self.revision,
            total_spend = self.current.total_spend(),
            "contract edit applied"
        );
        Ok(self.current())
    }

    fn build_next(&self, edit: ContractEdit) -> Result<ContractSnapshot, ContractError> {
        let mut next = ContractSnapshot::clone(&self.current);
        let touches_services = edit.touches_services();

        match edit {
            ContractEdit::SetCarrier(carrier) => next.set_carrier(carrier),
            ContractEdit::SetTotalSpend(spend) => {
                validate_spend(spend)?;
                next.set_total_spend(spend);
            }
            ContractEdit::SetContext(context) => next.set_context(context),
            ContractEdit::ReplaceServices(services) => *next.services_mut() = services,
            ContractEdit::AppendService => next.services_mut().push(ServiceTerm::empty()),
            ContractEdit::RemoveService(index) => {
                let services = next.services_mut();
                check_index(index, services.len())?;
                services.remove(index);
            }
            ContractEdit::SetServiceField {
                index,
                field,
                value,
            } => {
                let services = next.services_mut();
                check_index(index, services.len())?;
                let service = &mut services[index];
                match field {
                    ServiceField::ServiceType => service.service_type = value,
                    ServiceField::WeightRange => service.weight_range = value,
                    ServiceField::CurrentDiscount => {
                        service.current_discount_percent = parse_discount_percent(&value)?;
                    }
                }
            }
        }

        if touches_services {
            for (index, service) in next.services().iter().enumerate() {
                service.validate(index)?;
            }
            let spend = recompute_total_spend(next.base_spend(), next.services())?;
            validate_spend(spend)?;
            next.set_total_spend(spend);
        }

        Ok(next)
    }
}

fn check_index(index: usize, len: usize) -> Result<(), ContractError> {
    if index < len {
        Ok(())
    } else {
        Err(ContractError::IndexOutOfRange { index, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> ContractStore {
        let snapshot = ContractSnapshot::new(
            "UPS",
            1_000_000.0,
            vec![
                ServiceTerm::new("Ground", "1-5 lbs", 10.0),
                ServiceTerm::new("Ground", "6-10 lbs", 20.0),
            ],
        );
        ContractStore::open(snapshot).unwrap()
    }

    #[test]
    fn open_rejects_invalid_upload() {
        let err = ContractStore::open(ContractSnapshot::new("UPS", -5.0, vec![])).unwrap_err();
        assert!(err.is_invalid_contract());
    }

    #[test]
    fn carrier_edit_keeps_spend() {
        let mut store = store();
        let snap = store.apply_edit("carrier", json!("FedEx")).unwrap();
        assert_eq!(snap.carrier(), "FedEx");
        assert_eq!(snap.total_spend(), 1_000_000.0);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn previous_snapshot_is_not_mutated() {
        let mut store = store();
        let before = store.current();
        store.apply(ContractEdit::AppendService).unwrap();
        assert_eq!(before.services().len(), 2);
        assert_eq!(store.current().services().len(), 3);
    }

    #[test]
    fn append_recomputes_with_zero_discount_row() {
        let mut store = store();
        let snap = store.apply(ContractEdit::AppendService).unwrap();
        // mean of 10%, 20%, 0% = 10%
        assert!((snap.total_spend() - 900_000.0).abs() < 1e-9);
    }

    #[test]
    fn set_service_discount_parses_text() {
        let mut store = store();
        let snap = store
            .apply(ContractEdit::SetServiceField {
                index: 1,
                field: ServiceField::CurrentDiscount,
                value: "30%".to_string(),
            })
            .unwrap();
        assert_eq!(snap.services()[1].current_discount_percent, 30.0);
        assert!((snap.total_spend() - 800_000.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut store = store();
        let err = store.apply(ContractEdit::RemoveService(5)).unwrap_err();
        assert_eq!(err, ContractError::IndexOutOfRange { index: 5, len: 2 });
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn unknown_field_is_reported() {
        let mut store = store();
        let err = store.apply_edit("discountTier", json!(3)).unwrap_err();
        assert_eq!(err, ContractError::UnknownField("discountTier".to_string()));
    }

    #[test]
    fn wrong_value_shape_is_reported() {
        let mut store = store();
        assert!(matches!(
            store.apply_edit("carrier", json!(12)),
            Err(ContractError::InvalidValue { .. })
        ));
        assert!(matches!(
            store.apply_edit("services", json!("Ground")),
            Err(ContractError::InvalidValue { .. })
        ));
    }

    #[test]
    fn spend_edit_must_be_positive() {
        let mut store = store();
        assert!(store.apply_edit("totalSpend", json!(0)).unwrap_err().is_invalid_contract());
        let snap = store.apply_edit("totalSpend", json!("2500000")).unwrap();
        assert_eq!(snap.total_spend(), 2_500_000.0);
        assert_eq!(snap.base_spend(), 1_000_000.0);
    }

    #[test]
    fn context_edit_accepts_null() {
        let mut store = store();
        let snap = store.apply_edit("context", json!("peak season")).unwrap();
        assert_eq!(snap.context(), Some("peak season"));
        let snap = store.apply_edit("context", Value::Null).unwrap();
        assert_eq!(snap.context(), None);
    }
}
