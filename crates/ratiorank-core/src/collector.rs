//! Concurrent attribute collection.
//!
//! One provider request per symbol, bounded by a semaphore and a shared
//! rate budget. Every task owns the slot matching its input position, and
//! [`Collector::collect`] returns only after all tasks have finished. A
//! symbol whose request fails, times out, or panics still gets a row in the
//! resulting table, with every attribute missing.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::data_source::{AttributeSource, SourceError};
use crate::throttling::RequestThrottle;
use crate::{AttributeTable, CollectorConfig, ProviderId, RawAttributes, Symbol, UtcDateTime};

/// Why a symbol ended up with an all-missing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Source,
    Panicked,
}

impl FailureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Source => "source",
            Self::Panicked => "panicked",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-symbol collection failure, recorded instead of aborting the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorFailure {
    pub symbol: Symbol,
    pub ticker: String,
    pub kind: FailureKind,
    /// Source error code when `kind` is `Source`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    pub message: String,
}

impl CollectorFailure {
    fn timeout(symbol: Symbol, ticker: String, timeout_ms: u128) -> Self {
        Self {
            symbol,
            message: format!("request for '{ticker}' timed out after {timeout_ms} ms"),
            ticker,
            kind: FailureKind::Timeout,
            source_code: None,
        }
    }

    fn source(symbol: Symbol, ticker: String, error: &SourceError) -> Self {
        Self {
            symbol,
            ticker,
            kind: FailureKind::Source,
            source_code: Some(error.code().to_owned()),
            message: error.message().to_owned(),
        }
    }

    fn panicked(symbol: Symbol, ticker: String) -> Self {
        Self {
            symbol,
            message: format!("request task for '{ticker}' did not complete"),
            ticker,
            kind: FailureKind::Panicked,
            source_code: None,
        }
    }
}

impl Display for CollectorFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.symbol, self.kind, self.message)
    }
}

/// Outcome of one collection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub provider: ProviderId,
    pub as_of: UtcDateTime,
    pub latency_ms: u64,
    pub table: AttributeTable,
    pub failures: Vec<CollectorFailure>,
}

impl Collection {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

type TaskOutput = (usize, Result<RawAttributes, CollectorFailure>);

/// Fans symbol lookups out over an [`AttributeSource`].
#[derive(Clone)]
pub struct Collector {
    source: Arc<dyn AttributeSource>,
    config: CollectorConfig,
    throttle: RequestThrottle,
}

impl Collector {
    pub fn new(source: Arc<dyn AttributeSource>, config: CollectorConfig) -> Self {
        let throttle = RequestThrottle::per_second(config.requests_per_second);
        Self {
            source,
            config,
            throttle,
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn provider(&self) -> ProviderId {
        self.source.id()
    }

    /// Collects attributes for `symbols`, keeping their order. Repeated
    /// symbols are fetched once, at their first position.
    pub async fn collect(&self, symbols: &[Symbol]) -> Collection {
        let started = Instant::now();
        let as_of = UtcDateTime::now();

        let mut seen = HashSet::with_capacity(symbols.len());
        let unique: Vec<Symbol> = symbols
            .iter()
            .filter(|symbol| seen.insert(symbol.as_str()))
            .cloned()
            .collect();

        let tickers: Vec<String> = unique
            .iter()
            .map(|symbol| symbol.provider_ticker(&self.config.market_suffix))
            .collect();

        tracing::info!(
            provider = %self.source.id(),
            symbols = unique.len(),
            max_concurrency = self.config.max_concurrency,
            "collecting attributes"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks: JoinSet<TaskOutput> = JoinSet::new();

        for (index, (symbol, ticker)) in unique.iter().zip(&tickers).enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let source = Arc::clone(&self.source);
            let throttle = self.throttle.clone();
            let timeout = self.config.request_timeout;
            let symbol = symbol.clone();
            let ticker = ticker.clone();

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        let error = SourceError::internal("collector semaphore closed");
                        return (index, Err(CollectorFailure::source(symbol, ticker, &error)));
                    }
                };
                throttle.acquire().await;

                let fetched = tokio::time::timeout(timeout, source.fetch_attributes(&ticker)).await;
                let outcome = match fetched {
                    Ok(Ok(attributes)) => {
                        tracing::debug!(
                            %symbol,
                            %ticker,
                            present = attributes.present_count(),
                            "attributes fetched"
                        );
                        Ok(attributes)
                    }
                    Ok(Err(error)) => Err(CollectorFailure::source(symbol, ticker, &error)),
                    Err(_) => Err(CollectorFailure::timeout(symbol, ticker, timeout.as_millis())),
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Result<RawAttributes, CollectorFailure>>> =
            vec![None; unique.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(error) => tracing::error!(%error, "collector task aborted"),
            }
        }

        let mut table = AttributeTable::with_capacity(unique.len());
        let mut failures = Vec::new();
        for ((symbol, ticker), slot) in unique.into_iter().zip(tickers).zip(slots) {
            let outcome =
                slot.unwrap_or_else(|| Err(CollectorFailure::panicked(symbol.clone(), ticker)));
            match outcome {
                Ok(attributes) => table.insert(symbol, attributes),
                Err(failure) => {
                    tracing::warn!(
                        symbol = %failure.symbol,
                        ticker = %failure.ticker,
                        kind = %failure.kind,
                        message = %failure.message,
                        "symbol collected with all attributes missing"
                    );
                    failures.push(failure);
                    table.insert(symbol, RawAttributes::missing());
                }
            }
        }

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            collected = table.len(),
            failed = failures.len(),
            latency_ms,
            "collection finished"
        );

        Collection {
            provider: self.source.id(),
            as_of,
            latency_ms,
            table,
            failures,
        }
    }
}
