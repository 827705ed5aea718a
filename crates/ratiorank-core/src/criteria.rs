//! Ranking criteria: what each one is derived from and which way it ranks.
//!
//! A [`CriteriaSet`] is validated once when it is built. After that,
//! derivation cannot fail: every problem with a symbol's data turns into a
//! missing value.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AttributeTable, CriteriaError, Field, RawAttributes, Symbol};

/// Sort order applied before ranks are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankDirection {
    /// Rank 1 goes to the smallest value.
    Ascending,
    /// Rank 1 goes to the largest value.
    Descending,
}

impl RankDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

impl Display for RankDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankDirection {
    type Err = CriteriaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(Self::Ascending),
            "descending" | "desc" => Ok(Self::Descending),
            other => Err(CriteriaError::UnknownDirection {
                value: other.to_owned(),
            }),
        }
    }
}

/// Where missing values land in a rank column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// After every present value, whatever the direction.
    #[default]
    Bottom,
}

/// How a criterion value is obtained from a [`RawAttributes`] row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Derivation {
    /// Pass-through of one provider field.
    Field(Field),
    /// Position of the previous close inside the 52-week range.
    ClosenessToLow,
    /// Distance of beta from 1.
    BetaDistance,
}

impl Derivation {
    pub fn evaluate(self, attributes: &RawAttributes) -> Option<f64> {
        let value = match self {
            Self::Field(field) => attributes.get(field),
            Self::ClosenessToLow => closeness_to_low(attributes),
            Self::BetaDistance => beta_distance(attributes),
        };
        value.filter(|v| v.is_finite())
    }

    /// Provider fields this derivation reads.
    pub fn inputs(self) -> Vec<Field> {
        match self {
            Self::Field(field) => vec![field],
            Self::ClosenessToLow => vec![
                Field::PreviousClose,
                Field::FiftyTwoWeekLow,
                Field::FiftyTwoWeekHigh,
            ],
            Self::BetaDistance => vec![Field::Beta],
        }
    }
}

impl Display for Derivation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(field) => write!(f, "field:{field}"),
            Self::ClosenessToLow => f.write_str("closeness_to_low"),
            Self::BetaDistance => f.write_str("beta_distance"),
        }
    }
}

impl FromStr for Derivation {
    type Err = CriteriaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Some(name) = trimmed.strip_prefix("field:") {
            return name.parse::<Field>().map(Self::Field);
        }
        match trimmed {
            "closeness_to_low" => Ok(Self::ClosenessToLow),
            "beta_distance" => Ok(Self::BetaDistance),
            other => Err(CriteriaError::UnknownDerivation {
                value: other.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for Derivation {
    type Error = CriteriaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Derivation> for String {
    fn from(value: Derivation) -> Self {
        value.to_string()
    }
}

/// `(previousClose - low) / (high - low)`; lower means closer to the
/// 52-week low. Missing when any input is missing or the range is empty.
pub fn closeness_to_low(attributes: &RawAttributes) -> Option<f64> {
    let price = attributes.get(Field::PreviousClose)?;
    let low = attributes.get(Field::FiftyTwoWeekLow)?;
    let high = attributes.get(Field::FiftyTwoWeekHigh)?;

    let range = high - low;
    if range == 0.0 {
        return None;
    }
    Some((price - low) / range)
}

/// `|1 - beta|`.
pub fn beta_distance(attributes: &RawAttributes) -> Option<f64> {
    attributes.get(Field::Beta).map(|beta| (1.0 - beta).abs())
}

/// One ranking dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionSpec {
    pub code: String,
    pub name: String,
    pub derivation: Derivation,
    pub direction: RankDirection,
    #[serde(default)]
    pub missing: MissingPolicy,
}

impl CriterionSpec {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        derivation: Derivation,
        direction: RankDirection,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            derivation,
            direction,
            missing: MissingPolicy::Bottom,
        }
    }

    fn field(code: &str, name: &str, field: Field, direction: RankDirection) -> Self {
        Self::new(code, name, Derivation::Field(field), direction)
    }
}

/// Validated, ordered list of criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CriteriaSet {
    specs: Vec<CriterionSpec>,
}

impl CriteriaSet {
    /// The eleven-criterion value screen.
    pub fn standard() -> Self {
        use RankDirection::{Ascending, Descending};

        Self {
            specs: vec![
                CriterionSpec::new(
                    "CTL",
                    "Closeness to 52-week low",
                    Derivation::ClosenessToLow,
                    Ascending,
                ),
                CriterionSpec::new(
                    "SOFG",
                    "Distance of beta from 1",
                    Derivation::BetaDistance,
                    Descending,
                ),
                CriterionSpec::field("QR", "Quick ratio", Field::QuickRatio, Descending),
                CriterionSpec::field("CR", "Current ratio", Field::CurrentRatio, Descending),
                CriterionSpec::field("ROA", "Return on assets", Field::ReturnOnAssets, Descending),
                CriterionSpec::field("ROE", "Return on equity", Field::ReturnOnEquity, Descending),
                CriterionSpec::field("P/B", "Price-to-book", Field::PriceToBook, Ascending),
                CriterionSpec::field("P/E", "Trailing P/E", Field::TrailingPe, Ascending),
                CriterionSpec::field(
                    "P/S",
                    "Price-to-sales (TTM)",
                    Field::PriceToSalesTrailing12Months,
                    Ascending,
                ),
                CriterionSpec::field(
                    "DY",
                    "5-yr avg dividend yield",
                    Field::FiveYearAvgDividendYield,
                    Descending,
                ),
                CriterionSpec::field("DPR", "Payout ratio", Field::PayoutRatio, Ascending),
            ],
        }
    }

    pub fn builder() -> CriteriaSetBuilder {
        CriteriaSetBuilder::default()
    }

    /// Narrows the standard set to `codes`, in the order given.
    pub fn select<S: AsRef<str>>(codes: &[S]) -> Result<Self, CriteriaError> {
        let standard = Self::standard();
        let mut builder = Self::builder();
        for code in codes {
            let code = code.as_ref().trim();
            let spec = standard
                .get(code)
                .or_else(|| {
                    standard
                        .specs
                        .iter()
                        .find(|spec| spec.code.eq_ignore_ascii_case(code))
                })
                .ok_or_else(|| CriteriaError::UnknownCriterion {
                    code: code.to_owned(),
                })?;
            builder = builder.push(spec.clone());
        }
        builder.build()
    }

    pub fn get(&self, code: &str) -> Option<&CriterionSpec> {
        self.specs.iter().find(|spec| spec.code == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CriterionSpec> {
        self.specs.iter()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.specs.iter().map(|spec| spec.code.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// One value per criterion, in declaration order.
    pub fn derive_row(&self, attributes: &RawAttributes) -> Vec<Option<f64>> {
        self.specs
            .iter()
            .map(|spec| spec.derivation.evaluate(attributes))
            .collect()
    }

    pub fn derive_table(&self, table: &AttributeTable) -> CriterionTable {
        let rows = table
            .iter()
            .map(|(symbol, attributes)| CriterionRow {
                symbol: symbol.clone(),
                values: self.derive_row(attributes),
            })
            .collect();
        CriterionTable { rows }
    }
}

impl Default for CriteriaSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'de> Deserialize<'de> for CriteriaSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let specs = Vec::<CriterionSpec>::deserialize(deserializer)?;
        specs
            .into_iter()
            .fold(Self::builder(), CriteriaSetBuilder::push)
            .build()
            .map_err(serde::de::Error::custom)
    }
}

/// Collects specs and validates them in [`CriteriaSetBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct CriteriaSetBuilder {
    specs: Vec<CriterionSpec>,
}

impl CriteriaSetBuilder {
    pub fn push(mut self, spec: CriterionSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn build(self) -> Result<CriteriaSet, CriteriaError> {
        if self.specs.is_empty() {
            return Err(CriteriaError::Empty);
        }

        let mut seen = HashSet::with_capacity(self.specs.len());
        for spec in &self.specs {
            if spec.code.trim().is_empty() {
                return Err(CriteriaError::BlankCode);
            }
            if !seen.insert(spec.code.as_str()) {
                return Err(CriteriaError::DuplicateCode {
                    code: spec.code.clone(),
                });
            }
        }

        Ok(CriteriaSet { specs: self.specs })
    }
}

/// Derived criterion values for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionRow {
    pub symbol: Symbol,
    pub values: Vec<Option<f64>>,
}

/// One row per symbol of the source table, one column per criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionTable {
    rows: Vec<CriterionRow>,
}

impl CriterionTable {
    pub fn rows(&self) -> &[CriterionRow] {
        &self.rows
    }

    pub fn column(&self, index: usize) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|row| row.values.get(index).copied().flatten())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
