//! Reading an uploaded contract from disk
//!
//! The ingestion collaborator normally hands over a structured record; this
//! is the file-based stand-in used by the binary.

use crate::error::AnalyticsError;
use cna_contract::ContractSnapshot;
use std::path::Path;

/// Parse a contract from JSON text
///
/// # Errors
/// `InvalidUpload` describing the parse failure
pub fn contract_from_json(input: &str) -> Result<ContractSnapshot, AnalyticsError> {
    serde_json::from_str(input).map_err(|e| AnalyticsError::InvalidUpload(e.to_string()))
}

/// Parse a contract from YAML text
///
/// # Errors
/// `InvalidUpload` describing the parse failure
pub fn contract_from_yaml(input: &str) -> Result<ContractSnapshot, AnalyticsError> {
    serde_yaml::from_str(input).map_err(|e| AnalyticsError::InvalidUpload(e.to_string()))
}

/// Load a contract from a `.json`, `.yaml` or `.yml` file
///
/// The snapshot is validated so a bad upload fails here rather than at
/// session start.
///
/// # Errors
/// IO failure, unsupported extension, parse failure or invalid contract
pub fn load_contract(path: impl AsRef<Path>) -> Result<ContractSnapshot, AnalyticsError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| AnalyticsError::io_error(path, e))?;
    let snapshot = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => contract_from_json(&text)?,
        Some("yaml" | "yml") => contract_from_yaml(&text)?,
        other => {
            return Err(AnalyticsError::InvalidUpload(format!(
                "unsupported contract format '{}'",
                other.unwrap_or_default()
            )))
        }
    };
    snapshot.validate()?;
    tracing::info!(
        path = %path.display(),
        carrier = snapshot.carrier(),
        services = snapshot.services().len(),
        "Loaded contract upload"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cna_test_utils::{sample_contract, sample_contract_json};
    use std::io::Write;

    #[test]
    fn json_upload_matches_fixture() {
        let snapshot = contract_from_json(&sample_contract_json().to_string()).unwrap();
        assert_eq!(snapshot, sample_contract());
    }

    #[test]
    fn yaml_upload() {
        let snapshot = contract_from_yaml(
            "carrier: UPS\ntotalSpend: 1000\nservices:\n  - type: Ground\n    weightRange: 1-5 lbs\n    currentDiscount: 10\n",
        )
        .unwrap();
        assert_eq!(snapshot.services()[0].current_discount_percent, 10.0);
    }

    #[test]
    fn invalid_contract_file_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"carrier": "UPS", "totalSpend": 0, "services": []}}"#
        )
        .unwrap();
        let err = load_contract(file.path()).unwrap_err();
        assert!(matches!(err, AnalyticsError::Contract(_)));
    }

    #[test]
    fn garbage_is_invalid_upload() {
        assert!(matches!(
            contract_from_json("not json"),
            Err(AnalyticsError::InvalidUpload(_))
        ));
    }
}
