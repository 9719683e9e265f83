//! Error types for contract records
//!
//! Every failure is surfaced to the caller; nothing falls back to a zero or
//! default value.

/// Contract record and derivation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractError {
    /// Out-of-range discount or non-positive spend
    #[error("invalid contract: {0}")]
    InvalidContract(String),

    /// A derived value is undefined for the snapshot (e.g. no services)
    #[error("derivation failed: {0}")]
    Derivation(String),

    /// Edit targets a field the store does not recognise
    #[error("unknown field: '{0}'")]
    UnknownField(String),

    /// Edit value has the wrong shape for its field
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Positional service edit outside the service list
    #[error("service index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl ContractError {
    /// Create invalid value error for field
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if the contract content itself was rejected
    #[inline]
    #[must_use]
    pub fn is_invalid_contract(&self) -> bool {
        matches!(self, Self::InvalidContract(_))
    }

    /// Check if a derived value was undefined
    #[inline]
    #[must_use]
    pub fn is_derivation(&self) -> bool {
        matches!(self, Self::Derivation(_))
    }

    /// Check if the edit itself was malformed (field name, value shape, index)
    #[inline]
    #[must_use]
    pub fn is_edit_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownField(_) | Self::InvalidValue { .. } | Self::IndexOutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ContractError::UnknownField("discountTier".to_string());
        assert_eq!(err.to_string(), "unknown field: 'discountTier'");

        let err = ContractError::IndexOutOfRange { index: 4, len: 2 };
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn error_classification() {
        assert!(ContractError::Derivation("empty".into()).is_derivation());
        assert!(ContractError::InvalidContract("spend".into()).is_invalid_contract());
        assert!(ContractError::invalid_value("carrier", "expected string").is_edit_error());
        assert!(!ContractError::Derivation("empty".into()).is_edit_error());
    }
}
