//! Composite ranking: derive criteria, rank each column, sum, sort.
//!
//! The engine is a pure synchronous computation over a fully collected
//! [`AttributeTable`]. It never fails on data quality; missing data only
//! moves a symbol towards the bottom of the affected columns.

use serde::{Deserialize, Serialize};

use crate::rank::rank_column;
use crate::{AttributeTable, CriteriaSet, Symbol};

/// Rank of one symbol on one criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionRank {
    pub code: String,
    /// Derived criterion value; `None` when missing.
    pub value: Option<f64>,
    pub rank: f64,
}

/// One row of the final ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    pub symbol: Symbol,
    pub ranks: Vec<CriterionRank>,
    pub total: f64,
}

impl RankedRow {
    pub fn rank_of(&self, code: &str) -> Option<f64> {
        self.criterion(code).map(|entry| entry.rank)
    }

    pub fn value_of(&self, code: &str) -> Option<f64> {
        self.criterion(code).and_then(|entry| entry.value)
    }

    pub fn missing_count(&self) -> usize {
        self.ranks.iter().filter(|entry| entry.value.is_none()).count()
    }

    fn criterion(&self, code: &str) -> Option<&CriterionRank> {
        self.ranks.iter().find(|entry| entry.code == code)
    }
}

/// Rows ascending by total; equal totals keep input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ranking {
    rows: Vec<RankedRow>,
}

impl Ranking {
    pub fn rows(&self) -> &[RankedRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<RankedRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Zero-based position of `symbol` in the ranking.
    pub fn position(&self, symbol: &Symbol) -> Option<usize> {
        self.rows.iter().position(|row| &row.symbol == symbol)
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&RankedRow> {
        self.rows.iter().find(|row| &row.symbol == symbol)
    }

    /// Keeps only the best `n` rows.
    pub fn top(mut self, n: usize) -> Self {
        self.rows.truncate(n);
        self
    }
}

/// Applies a [`CriteriaSet`] to attribute tables.
#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    criteria: CriteriaSet,
}

impl RankingEngine {
    pub fn new(criteria: CriteriaSet) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &CriteriaSet {
        &self.criteria
    }

    pub fn rank(&self, table: &AttributeTable) -> Ranking {
        let derived = self.criteria.derive_table(table);

        let columns: Vec<Vec<f64>> = self
            .criteria
            .iter()
            .enumerate()
            .map(|(index, spec)| rank_column(&derived.column(index), spec.direction, spec.missing))
            .collect();

        let mut rows: Vec<RankedRow> = derived
            .rows()
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                let ranks: Vec<CriterionRank> = self
                    .criteria
                    .iter()
                    .zip(&columns)
                    .zip(&row.values)
                    .map(|((spec, column), value)| CriterionRank {
                        code: spec.code.clone(),
                        value: *value,
                        rank: column[row_index],
                    })
                    .collect();
                let total = ranks.iter().map(|entry| entry.rank).sum();
                RankedRow {
                    symbol: row.symbol.clone(),
                    ranks,
                    total,
                }
            })
            .collect();

        // `sort_by` is stable, so equal totals stay in input order.
        rows.sort_by(|a, b| a.total.total_cmp(&b.total));

        tracing::debug!(
            symbols = rows.len(),
            criteria = self.criteria.len(),
            "ranked attribute table"
        );

        Ranking { rows }
    }
}
