use std::collections::HashMap;
use std::time::Duration;

use crate::data_source::{AttributeSource, AttributesFuture, SourceError};
use crate::{AttributeTable, MarketSuffix, ProviderId, RawAttributes};

#[derive(Debug, Clone)]
enum Entry {
    Attributes(RawAttributes),
    Failure(SourceError),
}

/// In-memory attribute source keyed by provider ticker.
///
/// Lookups are case-insensitive. Unknown tickers fail with
/// `source.not_found`.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    entries: HashMap<String, Entry>,
    latency: Option<Duration>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a source serving `table`, keyed by each symbol's provider ticker.
    pub fn from_table(table: &AttributeTable, suffix: &MarketSuffix) -> Self {
        table
            .iter()
            .fold(Self::new(), |source, (symbol, attributes)| {
                source.with(&symbol.provider_ticker(suffix), attributes.clone())
            })
    }

    pub fn with(mut self, ticker: &str, attributes: RawAttributes) -> Self {
        self.entries
            .insert(normalize(ticker), Entry::Attributes(attributes));
        self
    }

    /// Makes lookups of `ticker` fail with `error`.
    pub fn with_failure(mut self, ticker: &str, error: SourceError) -> Self {
        self.entries.insert(normalize(ticker), Entry::Failure(error));
        self
    }

    /// Delays every lookup, as a slow provider would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(ticker: &str) -> String {
    ticker.trim().to_ascii_uppercase()
}

impl AttributeSource for FixtureSource {
    fn id(&self) -> ProviderId {
        ProviderId::Fixture
    }

    fn fetch_attributes<'a>(&'a self, ticker: &'a str) -> AttributesFuture<'a> {
        Box::pin(async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            match self.entries.get(&normalize(ticker)) {
                Some(Entry::Attributes(attributes)) => Ok(attributes.clone()),
                Some(Entry::Failure(error)) => Err(error.clone()),
                None => Err(SourceError::not_found(ticker)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::{Field, Symbol};

    #[tokio::test]
    async fn serves_known_tickers_case_insensitively() {
        let source =
            FixtureSource::new().with("PETR4.SA", RawAttributes::missing().with(Field::Beta, 1.3));

        let attributes = source.fetch_attributes("petr4.sa").await.expect("known ticker");
        assert_eq!(attributes.get(Field::Beta), Some(1.3));

        let error = source.fetch_attributes("VALE3.SA").await.expect_err("unknown");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn scripted_failures_are_returned() {
        let source = FixtureSource::new()
            .with_failure("OIBR3.SA", SourceError::unavailable("maintenance"));

        let error = source.fetch_attributes("OIBR3.SA").await.expect_err("scripted");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn from_table_keys_by_provider_ticker() {
        let mut table = AttributeTable::new();
        table.insert(
            Symbol::parse("itub4").expect("valid symbol"),
            RawAttributes::missing().with(Field::QuickRatio, 1.0),
        );

        let source = FixtureSource::from_table(&table, &MarketSuffix::default());
        assert_eq!(source.len(), 1);
        assert!(source.fetch_attributes("ITUB4.SA").await.is_ok());
    }
}
