use thiserror::Error;

/// Failures the recommendation engine surfaces to its callers.
///
/// `InvalidCategory` and `InvalidNumber` are client problems; the other two mean
/// the reference data (catalog or decoder) is broken and should page an
/// operator, not the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid {field}: {value:?} (expected one of {allowed:?})")]
    InvalidCategory {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("invalid {field}: {value} is not a finite number")]
    InvalidNumber { field: &'static str, value: f64 },

    #[error("identifier code {code} has no decoder entry")]
    UnknownIdentifier { code: i64 },

    #[error("catalog schema mismatch: {detail}")]
    SchemaMismatch { detail: String },
}

impl EngineError {
    pub fn schema_mismatch(detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            detail: detail.into(),
        }
    }

    /// True when the error points at bad deployment data rather than bad input.
    pub fn is_reference_data_fault(&self) -> bool {
        !matches!(
            self,
            Self::InvalidCategory { .. } | Self::InvalidNumber { .. }
        )
    }
}
