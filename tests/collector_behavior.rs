//! Behavior tests for the attribute collector.
//!
//! A collection always returns one row per requested symbol. These tests
//! cover concurrency, timeouts and provider failures.

use std::sync::Arc;
use std::time::Duration;

use ratiorank_core::{FailureKind, FixtureSource};
use ratiorank_tests::{
    fast_config, symbols, Collector, CriteriaSet, Field, RankingEngine, RawAttributes,
    SourceError, TrackingSource,
};

#[tokio::test]
async fn in_flight_requests_never_exceed_the_configured_bound() {
    // Given: a slow source and a collector limited to two concurrent requests
    let source = Arc::new(TrackingSource::with_delay(Duration::from_millis(30)));
    let collector = Collector::new(source.clone(), fast_config().with_max_concurrency(2));

    // When: eight symbols are collected
    let requested = symbols(&["A1", "B2", "C3", "D4", "E5", "F6", "G7", "H8"]);
    let collection = collector.collect(&requested).await;

    // Then: every symbol was fetched, never more than two at a time
    assert_eq!(collection.table.len(), 8);
    assert_eq!(source.calls().len(), 8);
    assert!(source.peak() <= 2, "peak in-flight was {}", source.peak());
    assert!(collection.is_complete());
}

#[tokio::test]
async fn tickers_carry_the_uppercased_symbol_and_market_suffix() {
    let source = Arc::new(TrackingSource::default());
    let collector = Collector::new(source.clone(), fast_config());

    collector.collect(&symbols(&["petr4"])).await;

    assert_eq!(source.calls(), vec![String::from("PETR4.SA")]);
}

#[tokio::test]
async fn rows_follow_request_order_regardless_of_completion_order() {
    let source = Arc::new(TrackingSource::with_delay(Duration::from_millis(5)));
    let collector = Collector::new(source, fast_config().with_max_concurrency(4));

    let requested = symbols(&["ZZZZ", "A", "MMM", "BB"]);
    let collection = collector.collect(&requested).await;

    let order: Vec<&str> = collection.table.symbols().map(|s| s.as_str()).collect();
    assert_eq!(order, vec!["ZZZZ", "A", "MMM", "BB"]);
}

#[tokio::test]
async fn repeated_symbols_are_fetched_once() {
    let source = Arc::new(TrackingSource::default());
    let collector = Collector::new(source.clone(), fast_config());

    let collection = collector.collect(&symbols(&["VALE3", "PETR4", "VALE3"])).await;

    assert_eq!(collection.table.len(), 2);
    assert_eq!(source.calls().len(), 2);
}

#[tokio::test]
async fn failing_symbol_surfaces_as_an_all_missing_row() {
    // Given: the provider knows PETR4 but rejects VALE3
    let source = FixtureSource::new()
        .with(
            "PETR4.SA",
            RawAttributes::missing().with(Field::QuickRatio, 1.1),
        )
        .with_failure("VALE3.SA", SourceError::unavailable("upstream down"));
    let collector = Collector::new(Arc::new(source), fast_config());

    // When
    let requested = symbols(&["PETR4", "VALE3", "ITUB4"]);
    let collection = collector.collect(&requested).await;

    // Then: the batch completes with a row for every symbol
    assert_eq!(collection.table.len(), 3);
    assert!(!collection.is_complete());
    let vale = collection
        .table
        .get(&requested[1])
        .expect("VALE3 keeps a row");
    assert!(vale.is_all_missing());

    // And: both failures are reported with their source codes
    let codes: Vec<Option<&str>> = collection
        .failures
        .iter()
        .map(|failure| failure.source_code.as_deref())
        .collect();
    assert_eq!(
        codes,
        vec![Some("source.unavailable"), Some("source.not_found")]
    );
    assert!(collection
        .failures
        .iter()
        .all(|failure| failure.kind == FailureKind::Source));
}

#[tokio::test]
async fn slow_symbol_times_out_without_blocking_the_batch() {
    // Given: a source slower than the per-request timeout
    let source = FixtureSource::new()
        .with("SLOW.SA", RawAttributes::missing().with(Field::Beta, 1.0))
        .with_latency(Duration::from_millis(200));
    let config = fast_config().with_request_timeout(Duration::from_millis(20));
    let collector = Collector::new(Arc::new(source), config);

    // When
    let collection = collector.collect(&symbols(&["SLOW"])).await;

    // Then: the symbol is kept with every attribute missing
    assert_eq!(collection.failures.len(), 1);
    assert_eq!(collection.failures[0].kind, FailureKind::Timeout);
    assert!(collection
        .table
        .get(&symbols(&["SLOW"])[0])
        .expect("row kept")
        .is_all_missing());
}

#[tokio::test]
async fn failed_symbols_rank_last_but_are_still_ranked() {
    let source = FixtureSource::new()
        .with(
            "GOOD.SA",
            RawAttributes::missing().with(Field::QuickRatio, 0.5),
        )
        .with_failure("BAD.SA", SourceError::rate_limited("slow down"));
    let collector = Collector::new(Arc::new(source), fast_config());

    let collection = collector.collect(&symbols(&["BAD", "GOOD"])).await;
    let ranking = RankingEngine::new(CriteriaSet::standard()).rank(&collection.table);

    let order: Vec<&str> = ranking.rows().iter().map(|row| row.symbol.as_str()).collect();
    assert_eq!(order, vec!["GOOD", "BAD"]);
    assert_eq!(ranking.rows()[1].missing_count(), 11);
}

#[tokio::test]
async fn empty_request_returns_an_empty_collection() {
    let collector = Collector::new(Arc::new(FixtureSource::new()), fast_config());

    let collection = collector.collect(&[]).await;

    assert!(collection.table.is_empty());
    assert!(collection.failures.is_empty());
}
