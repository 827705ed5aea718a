//! Behavior tests for the ranking engine.
//!
//! These tests check what a caller observes in a finished ranking: rank
//! columns, totals and row order.

use ratiorank_core::CriteriaError;
use ratiorank_tests::{complete_attributes, symbol, table, CriteriaSet, Field, RankingEngine, RawAttributes};

fn standard_engine() -> RankingEngine {
    RankingEngine::new(CriteriaSet::standard())
}

// =============================================================================
// Rank columns
// =============================================================================

#[test]
fn fully_populated_columns_are_permutations_of_one_to_n() {
    // Given: five symbols with distinct values on every criterion
    let input = table(
        (0..5)
            .map(|seed| {
                let name: &'static str = ["A", "B", "C", "D", "E"][seed];
                (name, complete_attributes(seed as f64))
            })
            .collect(),
    );

    // When: the engine ranks them
    let ranking = standard_engine().rank(&input);

    // Then: every column holds each rank 1..=5 exactly once
    for code in CriteriaSet::standard().codes() {
        let mut column: Vec<f64> = ranking
            .rows()
            .iter()
            .map(|row| row.rank_of(code).expect("every row has every criterion"))
            .collect();
        column.sort_by(f64::total_cmp);
        assert_eq!(column, vec![1.0, 2.0, 3.0, 4.0, 5.0], "column {code}");
    }
}

#[test]
fn missing_value_holds_the_worst_rank_in_its_column() {
    // Given: three symbols where only B lacks a payout ratio
    let input = table(vec![
        ("A", complete_attributes(1.0)),
        ("B", {
            let mut attributes = complete_attributes(2.0);
            attributes.set(Field::PayoutRatio, None);
            attributes
        }),
        ("C", complete_attributes(3.0)),
    ]);

    // When
    let ranking = standard_engine().rank(&input);

    // Then: B ranks strictly below every present value on DPR
    let b = ranking.get(&symbol("B")).expect("B is ranked");
    let others: Vec<f64> = ["A", "C"]
        .iter()
        .map(|name| {
            ranking
                .get(&symbol(name))
                .and_then(|row| row.rank_of("DPR"))
                .expect("rank present")
        })
        .collect();
    let b_rank = b.rank_of("DPR").expect("rank present");
    assert_eq!(b_rank, 3.0);
    assert!(others.iter().all(|rank| *rank < b_rank));
    assert_eq!(b.value_of("DPR"), None);
}

#[test]
fn degenerate_52_week_range_ranks_last_on_closeness_to_low() {
    // Given: X has a 52-week high equal to its low; Y and Z look normal
    let degenerate = complete_attributes(0.0)
        .with(Field::FiftyTwoWeekLow, 10.0)
        .with(Field::FiftyTwoWeekHigh, 10.0);
    let input = table(vec![
        ("X", degenerate),
        ("Y", complete_attributes(4.0)),
        ("Z", complete_attributes(1.0)),
    ]);

    // When
    let ranking = standard_engine().rank(&input);

    // Then: X is missing on CTL and takes the worst rank
    let x = ranking.get(&symbol("X")).expect("X is ranked");
    assert_eq!(x.value_of("CTL"), None);
    assert_eq!(x.rank_of("CTL"), Some(3.0));
}

#[test]
fn column_missing_for_everyone_ties_all_symbols() {
    // Given: nobody reports a quick ratio
    let input = table(vec![
        ("A", RawAttributes::missing().with(Field::CurrentRatio, 1.0)),
        ("B", RawAttributes::missing().with(Field::CurrentRatio, 2.0)),
        ("C", RawAttributes::missing().with(Field::CurrentRatio, 3.0)),
        ("D", RawAttributes::missing().with(Field::CurrentRatio, 4.0)),
    ]);
    let engine = RankingEngine::new(CriteriaSet::select(&["QR", "CR"]).expect("known codes"));

    // When
    let ranking = engine.rank(&input);

    // Then: QR is a single tie at the mean of 1..=4, and CR decides the order
    assert!(ranking
        .rows()
        .iter()
        .all(|row| row.rank_of("QR") == Some(2.5)));
    let order: Vec<&str> = ranking.rows().iter().map(|row| row.symbol.as_str()).collect();
    assert_eq!(order, vec!["D", "C", "B", "A"]);
}

// =============================================================================
// Totals and ordering
// =============================================================================

#[test]
fn higher_quick_ratio_wins_when_everything_else_is_missing() {
    // Given: A and B differ only on quick ratio
    let input = table(vec![
        ("B", RawAttributes::missing().with(Field::QuickRatio, 1.0)),
        ("A", RawAttributes::missing().with(Field::QuickRatio, 2.0)),
    ]);

    // When
    let ranking = standard_engine().rank(&input);

    // Then: quick ratio ranks descending, so A takes rank 1 and sorts first
    let rows = ranking.rows();
    assert_eq!(rows[0].symbol.as_str(), "A");
    assert_eq!(rows[0].rank_of("QR"), Some(1.0));
    assert_eq!(rows[1].rank_of("QR"), Some(2.0));
    assert_eq!(rows[0].total, 16.0);
    assert_eq!(rows[1].total, 17.0);
}

#[test]
fn total_is_the_exact_sum_of_criterion_ranks() {
    let input = table(vec![
        ("A", complete_attributes(3.0)),
        ("B", RawAttributes::missing().with(Field::Beta, 1.3)),
        ("C", complete_attributes(1.0)),
        ("D", RawAttributes::missing()),
    ]);

    let ranking = standard_engine().rank(&input);

    for row in ranking.rows() {
        let sum: f64 = row.ranks.iter().map(|entry| entry.rank).sum();
        assert_eq!(row.total, sum, "{}", row.symbol);
        assert_eq!(row.ranks.len(), 11);
    }
}

#[test]
fn rows_are_ordered_by_non_decreasing_total() {
    let input = table(vec![
        ("A", RawAttributes::missing()),
        ("B", complete_attributes(2.0)),
        ("C", complete_attributes(0.5)),
        ("D", RawAttributes::missing().with(Field::TrailingPe, 7.0)),
        ("E", complete_attributes(4.0)),
    ]);

    let ranking = standard_engine().rank(&input);

    assert_eq!(ranking.len(), 5);
    assert!(ranking
        .rows()
        .windows(2)
        .all(|pair| pair[0].total <= pair[1].total));
}

#[test]
fn identical_symbols_share_ranks_and_keep_input_order() {
    // Given: three symbols tied on every criterion
    let input = table(vec![
        ("C", complete_attributes(1.0)),
        ("A", complete_attributes(1.0)),
        ("B", complete_attributes(1.0)),
    ]);

    // When
    let ranking = standard_engine().rank(&input);

    // Then: each column is a three-way tie at rank 2 and input order survives
    let order: Vec<&str> = ranking.rows().iter().map(|row| row.symbol.as_str()).collect();
    assert_eq!(order, vec!["C", "A", "B"]);
    for row in ranking.rows() {
        assert!(row.ranks.iter().all(|entry| entry.rank == 2.0));
        assert_eq!(row.total, 22.0);
    }
}

#[test]
fn changing_one_value_only_moves_that_symbol_and_the_one_it_swaps_with() {
    // Given: three symbols ranked on quick ratio alone
    let engine = RankingEngine::new(CriteriaSet::select(&["QR"]).expect("known code"));
    let before = engine.rank(&table(vec![
        ("A", RawAttributes::missing().with(Field::QuickRatio, 3.0)),
        ("B", RawAttributes::missing().with(Field::QuickRatio, 2.0)),
        ("C", RawAttributes::missing().with(Field::QuickRatio, 1.0)),
    ]));

    // When: B's quick ratio rises above A's
    let after = engine.rank(&table(vec![
        ("A", RawAttributes::missing().with(Field::QuickRatio, 3.0)),
        ("B", RawAttributes::missing().with(Field::QuickRatio, 4.0)),
        ("C", RawAttributes::missing().with(Field::QuickRatio, 1.0)),
    ]));

    // Then: C is untouched while A and B trade places
    let total = |ranking: &ratiorank_core::Ranking, name: &str| {
        ranking.get(&symbol(name)).map(|row| row.total)
    };
    assert_eq!(total(&before, "C"), total(&after, "C"));
    assert_eq!(total(&before, "A"), Some(1.0));
    assert_eq!(total(&after, "A"), Some(2.0));
    assert_eq!(total(&after, "B"), Some(1.0));
}

#[test]
fn ranking_the_same_table_twice_serializes_identically() {
    let input = table(vec![
        ("A", complete_attributes(1.5)),
        ("B", RawAttributes::missing().with(Field::QuickRatio, 0.9)),
        ("C", complete_attributes(0.2)),
    ]);
    let engine = standard_engine();

    let first = serde_json::to_string(&engine.rank(&input)).expect("serializes");
    let second = serde_json::to_string(&engine.rank(&input)).expect("serializes");

    assert_eq!(first, second);
}

#[test]
fn top_keeps_the_best_rows_in_order() {
    let input = table(vec![
        ("A", RawAttributes::missing().with(Field::QuickRatio, 1.0)),
        ("B", RawAttributes::missing().with(Field::QuickRatio, 3.0)),
        ("C", RawAttributes::missing().with(Field::QuickRatio, 2.0)),
    ]);
    let engine = RankingEngine::new(CriteriaSet::select(&["QR"]).expect("known code"));

    let top = engine.rank(&input).top(2);

    let order: Vec<&str> = top.rows().iter().map(|row| row.symbol.as_str()).collect();
    assert_eq!(order, vec!["B", "C"]);
}

// =============================================================================
// Configuration errors
// =============================================================================

#[test]
fn unknown_criterion_code_fails_before_any_ranking() {
    let error = CriteriaSet::select(&["QR", "NOPE"]).expect_err("unknown code");
    assert!(matches!(error, CriteriaError::UnknownCriterion { .. }));
}
