//! Attribute source trait and its error type.
//!
//! An [`AttributeSource`] resolves one provider ticker (for example
//! `PETR4.SA`) into a [`RawAttributes`] record. The collector fans requests
//! out over any implementation; the Yahoo adapter and the in-memory
//! fixture source are the two shipped ones.
//!
//! # Example
//!
//! ```rust,ignore
//! use ratiorank_core::{AttributeSource, FixtureSource, Field, RawAttributes};
//!
//! async fn lookup(source: &FixtureSource) {
//!     let attributes = source.fetch_attributes("PETR4.SA").await.unwrap();
//!     println!("{:?}", attributes.get(Field::TrailingPe));
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{ProviderId, RawAttributes};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    NotFound,
    InvalidRequest,
    InvalidResponse,
    Internal,
}

/// Structured source error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn not_found(ticker: &str) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: format!("no attributes available for '{ticker}'"),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidResponse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::InvalidResponse => "source.invalid_response",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Future returned by [`AttributeSource::fetch_attributes`].
pub type AttributesFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RawAttributes, SourceError>> + Send + 'a>>;

/// Per-ticker attribute lookup contract.
///
/// Implementations must be `Send + Sync`; the collector shares one instance
/// across every in-flight request.
pub trait AttributeSource: Send + Sync {
    /// Returns the provider identifier reported in envelopes.
    fn id(&self) -> ProviderId;

    /// Fetches the attribute record for one provider ticker.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the provider is unreachable, rejects the
    /// request, or answers with a payload that cannot be decoded. A field the
    /// provider simply does not report is not an error; it stays `None`.
    fn fetch_attributes<'a>(&'a self, ticker: &'a str) -> AttributesFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_retryability_follow_kind() {
        let error = SourceError::rate_limited("slow down");
        assert_eq!(error.code(), "source.rate_limited");
        assert!(error.retryable());

        let error = SourceError::not_found("XPTO3.SA");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
        assert!(!error.retryable());
        assert!(error.message().contains("XPTO3.SA"));
    }

    #[test]
    fn display_includes_code() {
        let error = SourceError::invalid_response("bad json");
        assert_eq!(error.to_string(), "bad json (source.invalid_response)");
    }
}
