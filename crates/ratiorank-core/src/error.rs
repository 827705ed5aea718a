use thiserror::Error;

/// Validation and contract errors exposed by `ratiorank-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("market suffix must be empty or '.' followed by ASCII letters: '{value}'")]
    InvalidMarketSuffix { value: String },

    #[error("invalid source '{value}', expected one of yahoo, fixture")]
    InvalidSource { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },

    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Criteria configuration errors. Raised while building a criteria set,
/// before any symbol is processed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("criteria set must declare at least one criterion")]
    Empty,
    #[error("criterion code cannot be blank")]
    BlankCode,
    #[error("criterion '{code}' is declared more than once")]
    DuplicateCode { code: String },
    #[error("unknown criterion '{code}'")]
    UnknownCriterion { code: String },
    #[error("unknown attribute field '{name}'")]
    UnknownField { name: String },
    #[error("unknown derivation '{value}', expected closeness_to_low, beta_distance or field:<name>")]
    UnknownDerivation { value: String },
    #[error("unknown rank direction '{value}', expected ascending or descending")]
    UnknownDirection { value: String },
}

/// Invalid environment configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value '{value}': {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
