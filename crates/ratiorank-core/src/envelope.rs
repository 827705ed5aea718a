use serde::{Deserialize, Serialize};

use crate::{CollectorFailure, ProviderId, Symbol, UtcDateTime, ValidationError};

/// Schema version stamped on every envelope.
pub const SCHEMA_VERSION: &str = "v1.0.0";

/// Error code used for per-symbol collection failures.
pub const COLLECTOR_FAILURE_CODE: &str = "collector.failure";

/// Standard response envelope for all `ratiorank` machine-readable outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn success(meta: EnvelopeMeta, data: T) -> Self {
        Self {
            meta,
            data,
            errors: Vec::new(),
        }
    }

    pub fn with_errors(
        meta: EnvelopeMeta,
        data: T,
        errors: Vec<EnvelopeError>,
    ) -> Result<Self, ValidationError> {
        meta.validate_schema_compliance()?;
        for error in &errors {
            error.validate()?;
        }

        Ok(Self { meta, data, errors })
    }

    pub fn push_error(&mut self, error: EnvelopeError) -> Result<(), ValidationError> {
        error.validate()?;
        self.errors.push(error);
        Ok(())
    }
}

/// Metadata attached to every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub schema_version: String,
    pub generated_at: UtcDateTime,
    pub provider: ProviderId,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn new(
        request_id: impl Into<String>,
        provider: ProviderId,
        latency_ms: u64,
    ) -> Result<Self, ValidationError> {
        let meta = Self {
            request_id: request_id.into(),
            schema_version: String::from(SCHEMA_VERSION),
            generated_at: UtcDateTime::now(),
            provider,
            latency_ms,
            warnings: Vec::new(),
        };
        meta.validate_schema_compliance()?;
        Ok(meta)
    }

    pub fn with_generated_at(mut self, generated_at: UtcDateTime) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn validate_schema_compliance(&self) -> Result<(), ValidationError> {
        if self.request_id.trim().len() < 8 {
            return Err(ValidationError::InvalidRequestId);
        }

        if !is_valid_schema_version(&self.schema_version) {
            return Err(ValidationError::InvalidSchemaVersion {
                value: self.schema_version.clone(),
            });
        }

        Ok(())
    }
}

/// Structured error payload for partial or failed responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Symbol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ProviderId>,
}

impl EnvelopeError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let error = Self {
            code: code.into(),
            message: message.into(),
            symbol: None,
            retryable: None,
            source: None,
        };
        error.validate()?;
        Ok(error)
    }

    /// Envelope entry for a symbol the collector could not fetch.
    pub fn collector_failure(failure: &CollectorFailure, source: ProviderId) -> Self {
        let message = if failure.message.trim().is_empty() {
            format!("{} failure for '{}'", failure.kind, failure.ticker)
        } else {
            format!("{}: {}", failure.kind, failure.message)
        };
        Self {
            code: String::from(COLLECTOR_FAILURE_CODE),
            message,
            symbol: Some(failure.symbol.clone()),
            retryable: None,
            source: Some(source),
        }
    }

    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn with_source(mut self, source: ProviderId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.code.trim().is_empty() {
            return Err(ValidationError::EmptyErrorCode);
        }

        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyErrorMessage);
        }

        Ok(())
    }
}

fn is_valid_schema_version(value: &str) -> bool {
    let Some(version) = value.strip_prefix('v') else {
        return false;
    };

    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FailureKind;

    #[test]
    fn builds_valid_meta() {
        let meta = EnvelopeMeta::new("request-12345", ProviderId::Yahoo, 11)
            .expect("meta should be valid");

        assert_eq!(meta.schema_version, SCHEMA_VERSION);
        assert!(meta.warnings.is_empty());
    }

    #[test]
    fn rejects_short_request_id() {
        let error = EnvelopeMeta::new("req", ProviderId::Yahoo, 1).expect_err("must fail");
        assert_eq!(error, ValidationError::InvalidRequestId);
    }

    #[test]
    fn rejects_bad_schema_version() {
        let mut meta = EnvelopeMeta::new("request-12345", ProviderId::Fixture, 1)
            .expect("meta must be valid");
        meta.schema_version = String::from("1.0");

        let error = meta.validate_schema_compliance().expect_err("must fail");
        assert!(matches!(error, ValidationError::InvalidSchemaVersion { .. }));
    }

    #[test]
    fn rejects_blank_error_fields() {
        assert_eq!(
            EnvelopeError::new(" ", "message").expect_err("blank code"),
            ValidationError::EmptyErrorCode
        );
        assert_eq!(
            EnvelopeError::new("code", "").expect_err("blank message"),
            ValidationError::EmptyErrorMessage
        );
    }

    #[test]
    fn collector_failure_maps_to_envelope_error() {
        let failure = CollectorFailure {
            symbol: Symbol::parse("PETR4").expect("valid symbol"),
            ticker: String::from("PETR4.SA"),
            kind: FailureKind::Timeout,
            source_code: None,
            message: String::from("request for 'PETR4.SA' timed out after 10 ms"),
        };

        let error = EnvelopeError::collector_failure(&failure, ProviderId::Yahoo);
        assert_eq!(error.code, COLLECTOR_FAILURE_CODE);
        assert_eq!(error.symbol.as_ref().map(Symbol::as_str), Some("PETR4"));
        assert!(error.message.starts_with("timeout: "));
        assert!(error.validate().is_ok());
    }

    #[test]
    fn error_list_is_omitted_when_empty() {
        let meta = EnvelopeMeta::new("request-12345", ProviderId::Fixture, 0)
            .expect("meta must be valid");
        let json = serde_json::to_value(Envelope::success(meta, 1)).expect("serializable");
        assert!(json.get("errors").is_none());
        assert_eq!(json["data"], 1);
        assert_eq!(json["meta"]["provider"], "fixture");
    }
}
