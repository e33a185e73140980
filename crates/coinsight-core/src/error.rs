use thiserror::Error;

/// Validation and contract errors exposed by `coinsight-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid data source '{value}', expected one of primary, secondary")]
    InvalidDataSource { value: String },
    #[error("invalid provider '{value}', expected one of backend, coingecko")]
    InvalidProvider { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("feature id cannot be empty")]
    EmptyFeatureId,
}

/// Errors raised while loading or persisting policy snapshots.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("key-value store error: {0}")]
    Store(String),

    #[error("policy snapshot could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("policy snapshot version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_error_wraps_component_errors() {
        let validation: CoreError = ValidationError::EmptyFeatureId.into();
        assert_eq!(validation.to_string(), "feature id cannot be empty");

        let policy: CoreError = PolicyError::UnsupportedVersion {
            found: 3,
            supported: 1,
        }
        .into();
        assert!(matches!(policy, CoreError::Policy(_)));
    }
}
