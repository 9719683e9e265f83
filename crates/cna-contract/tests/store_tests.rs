//! Contract store tests
//!
//! Exercises the editor-facing surface: string-keyed edits, the total spend
//! recompute on service changes, and rejection of undefined derivations.

use cna_contract::{ContractEdit, ContractError, ContractSnapshot, ContractStore, ServiceTerm};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn upload() -> ContractSnapshot {
    ContractSnapshot::new(
        "UPS",
        5_000_000.0,
        vec![ServiceTerm::new("Ground", "1-5 lbs", 10.0)],
    )
}

#[test]
fn services_edit_recomputes_total_spend_from_base() {
    let mut store = ContractStore::open(upload()).unwrap();

    let snapshot = store
        .apply_edit(
            "services",
            json!([
                {"type": "Ground", "weightRange": "1-5 lbs", "currentDiscount": 10},
                {"type": "2nd Day Air", "weightRange": "1-10 lbs", "currentDiscount": "15%"}
            ]),
        )
        .unwrap();

    // mean discount 12.5%
    assert!((snapshot.total_spend() - 4_375_000.0).abs() < 1e-6);
    assert_eq!(snapshot.base_spend(), 5_000_000.0);
}

#[test]
fn sequential_service_edits_do_not_leak_state() {
    let mut store = ContractStore::open(upload()).unwrap();

    let two = store
        .apply_edit(
            "services",
            json!([
                {"type": "Ground", "weightRange": "1-5 lbs", "currentDiscount": 10},
                {"type": "Ground", "weightRange": "6-10 lbs", "currentDiscount": 30}
            ]),
        )
        .unwrap();
    assert!((two.total_spend() - 4_000_000.0).abs() < 1e-6);

    let one = store
        .apply_edit(
            "services",
            json!([{"type": "Ground", "weightRange": "6-10 lbs", "currentDiscount": 30}]),
        )
        .unwrap();
    // recomputed from the upload spend, not from the 2-item result
    assert!((one.total_spend() - 3_500_000.0).abs() < 1e-6);
    assert_eq!(store.revision(), 2);
}

#[test]
fn removing_the_only_service_is_a_derivation_error() {
    let mut store = ContractStore::open(upload()).unwrap();

    let err = store.apply(ContractEdit::RemoveService(0)).unwrap_err();
    assert!(matches!(err, ContractError::Derivation(_)));

    // the rejected edit left the published snapshot untouched
    let current = store.current();
    assert_eq!(current.services().len(), 1);
    assert!(current.total_spend().is_finite());
}

#[test]
fn empty_services_replacement_is_rejected() {
    let mut store = ContractStore::open(upload()).unwrap();
    let err = store.apply_edit("services", json!([])).unwrap_err();
    assert!(err.is_derivation());
}

#[test]
fn out_of_range_discount_in_services_is_rejected() {
    let mut store = ContractStore::open(upload()).unwrap();
    let err = store
        .apply_edit(
            "services",
            json!([{"type": "Ground", "weightRange": "1-5 lbs", "currentDiscount": 140}]),
        )
        .unwrap_err();
    assert!(err.is_invalid_contract());
}

#[test]
fn held_snapshots_survive_later_edits() {
    let mut store = ContractStore::open(upload()).unwrap();
    let first = store.current();
    store.apply_edit("carrier", json!("FedEx")).unwrap();
    store.apply(ContractEdit::AppendService).unwrap();

    assert_eq!(first.carrier(), "UPS");
    assert_eq!(first.services().len(), 1);
    assert_eq!(store.current().carrier(), "FedEx");
}

proptest! {
    #[test]
    fn prop_total_spend_matches_mean_discount(
        base in 1.0f64..1e9,
        discounts in prop::collection::vec(0.0f64..=100.0, 1..12),
    ) {
        let mut store = ContractStore::open(ContractSnapshot::new(
            "UPS",
            base,
            vec![ServiceTerm::new("Ground", "1-5 lbs", 0.0)],
        ))
        .unwrap();

        let services: Vec<ServiceTerm> = discounts
            .iter()
            .map(|d| ServiceTerm::new("Ground", "1-5 lbs", *d))
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let mean = discounts.iter().map(|d| d / 100.0).sum::<f64>() / discounts.len() as f64;
        let expected = base * (1.0 - mean);

        match store.apply(ContractEdit::ReplaceServices(services)) {
            Ok(snapshot) => {
                prop_assert!((snapshot.total_spend() - expected).abs() <= 1e-9 * base.max(1.0));
            }
            // every discount at 100% leaves no spend at all
            Err(err) => {
                prop_assert!(err.is_invalid_contract());
                prop_assert!(expected <= 0.0);
            }
        }
    }
}
