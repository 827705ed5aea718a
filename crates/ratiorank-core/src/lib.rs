//! # Ratiorank Core
//!
//! Composite ranking of equities by financial ratios.
//!
//! ## Overview
//!
//! Two components composed linearly:
//!
//! - **Attribute collection**: concurrent per-symbol lookups against an
//!   [`AttributeSource`] (Yahoo Finance or an in-memory fixture), producing an
//!   ordered [`AttributeTable`]. Failed lookups become all-missing rows.
//! - **Ranking**: a [`RankingEngine`] derives every criterion of a
//!   [`CriteriaSet`], ranks each column with average ties and missing values
//!   at the bottom, sums the ranks, and sorts ascending by total.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Yahoo `quoteSummary` adapter and fixture source |
//! | [`circuit_breaker`] | Circuit breaker for upstream calls |
//! | [`collector`] | Bounded concurrent attribute collection |
//! | [`config`] | Collector settings and environment overrides |
//! | [`criteria`] | Criterion declarations and derivations |
//! | [`data_source`] | Attribute source trait and source errors |
//! | [`domain`] | Symbols, attributes, timestamps |
//! | [`engine`] | Ranking engine and ranking output |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`rank`] | Per-column rank transform |
//! | [`retry`] | Retry policy with backoff |
//! | [`source`] | Provider identifiers |
//! | [`throttling`] | Request rate limiting |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ratiorank_core::{Collector, CollectorConfig, RankingEngine, Symbol, YahooAdapter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let collector = Collector::new(Arc::new(YahooAdapter::live()), CollectorConfig::from_env()?);
//!     let symbols = vec![Symbol::parse("PETR4")?, Symbol::parse("VALE3")?];
//!
//!     let collection = collector.collect(&symbols).await;
//!     let ranking = RankingEngine::default().rank(&collection.table);
//!
//!     for row in ranking.rows() {
//!         println!("{} {:.1}", row.symbol, row.total);
//!     }
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod circuit_breaker;
pub mod collector;
pub mod config;
pub mod criteria;
pub mod data_source;
pub mod domain;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod rank;
pub mod retry;
pub mod source;
pub mod throttling;

pub use adapters::{FixtureSource, YahooAdapter, YahooAuthManager};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use collector::{Collection, Collector, CollectorFailure, FailureKind};
pub use config::CollectorConfig;
pub use criteria::{
    beta_distance, closeness_to_low, CriteriaSet, CriteriaSetBuilder, CriterionRow,
    CriterionSpec, CriterionTable, Derivation, MissingPolicy, RankDirection,
};
pub use data_source::{AttributeSource, AttributesFuture, SourceError, SourceErrorKind};
pub use domain::{AttributeTable, Field, MarketSuffix, RawAttributes, Symbol, UtcDateTime};
pub use engine::{CriterionRank, RankedRow, Ranking, RankingEngine};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, COLLECTOR_FAILURE_CODE, SCHEMA_VERSION};
pub use error::{ConfigError, CoreError, CriteriaError, ValidationError};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};
pub use rank::rank_column;
pub use retry::{Backoff, RetryConfig};
pub use source::ProviderId;
pub use throttling::RequestThrottle;
