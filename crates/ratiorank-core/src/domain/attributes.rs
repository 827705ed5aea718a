use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{CriteriaError, Symbol};

/// Provider attribute names collected for every symbol.
///
/// The first thirteen feed the standard criteria; the rest are collected but
/// unused by the standard set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    PreviousClose,
    FiftyTwoWeekLow,
    FiftyTwoWeekHigh,
    Beta,
    QuickRatio,
    CurrentRatio,
    ReturnOnAssets,
    ReturnOnEquity,
    PriceToBook,
    TrailingPe,
    PriceToSalesTrailing12Months,
    FiveYearAvgDividendYield,
    PayoutRatio,
    FloatShares,
    EnterpriseToRevenue,
    EnterpriseToEbitda,
    BookValue,
    DebtToEquity,
    GrossProfits,
    EarningsGrowth,
}

impl Field {
    pub const ALL: [Self; 20] = [
        Self::PreviousClose,
        Self::FiftyTwoWeekLow,
        Self::FiftyTwoWeekHigh,
        Self::Beta,
        Self::QuickRatio,
        Self::CurrentRatio,
        Self::ReturnOnAssets,
        Self::ReturnOnEquity,
        Self::PriceToBook,
        Self::TrailingPe,
        Self::PriceToSalesTrailing12Months,
        Self::FiveYearAvgDividendYield,
        Self::PayoutRatio,
        Self::FloatShares,
        Self::EnterpriseToRevenue,
        Self::EnterpriseToEbitda,
        Self::BookValue,
        Self::DebtToEquity,
        Self::GrossProfits,
        Self::EarningsGrowth,
    ];

    /// Provider field name (Yahoo `quoteSummary` spelling).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreviousClose => "previousClose",
            Self::FiftyTwoWeekLow => "fiftyTwoWeekLow",
            Self::FiftyTwoWeekHigh => "fiftyTwoWeekHigh",
            Self::Beta => "beta",
            Self::QuickRatio => "quickRatio",
            Self::CurrentRatio => "currentRatio",
            Self::ReturnOnAssets => "returnOnAssets",
            Self::ReturnOnEquity => "returnOnEquity",
            Self::PriceToBook => "priceToBook",
            Self::TrailingPe => "trailingPE",
            Self::PriceToSalesTrailing12Months => "priceToSalesTrailing12Months",
            Self::FiveYearAvgDividendYield => "fiveYearAvgDividendYield",
            Self::PayoutRatio => "payoutRatio",
            Self::FloatShares => "floatShares",
            Self::EnterpriseToRevenue => "enterpriseToRevenue",
            Self::EnterpriseToEbitda => "enterpriseToEbitda",
            Self::BookValue => "bookValue",
            Self::DebtToEquity => "debtToEquity",
            Self::GrossProfits => "grossProfits",
            Self::EarningsGrowth => "earningsGrowth",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = CriteriaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == trimmed)
            .ok_or_else(|| CriteriaError::UnknownField {
                name: trimmed.to_owned(),
            })
    }
}

/// Raw provider attributes for one symbol. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttributes {
    #[serde(default, deserialize_with = "lenient_number")]
    pub previous_close: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fifty_two_week_low: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fifty_two_week_high: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub beta: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub quick_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub current_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub return_on_assets: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub return_on_equity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price_to_book: Option<f64>,
    #[serde(rename = "trailingPE", default, deserialize_with = "lenient_number")]
    pub trailing_pe: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price_to_sales_trailing12_months: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub five_year_avg_dividend_yield: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub payout_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub float_shares: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub enterprise_to_revenue: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub enterprise_to_ebitda: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub book_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub debt_to_equity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub gross_profits: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub earnings_growth: Option<f64>,
}

impl RawAttributes {
    /// A row with every field missing; what a failed fetch produces.
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::PreviousClose => self.previous_close,
            Field::FiftyTwoWeekLow => self.fifty_two_week_low,
            Field::FiftyTwoWeekHigh => self.fifty_two_week_high,
            Field::Beta => self.beta,
            Field::QuickRatio => self.quick_ratio,
            Field::CurrentRatio => self.current_ratio,
            Field::ReturnOnAssets => self.return_on_assets,
            Field::ReturnOnEquity => self.return_on_equity,
            Field::PriceToBook => self.price_to_book,
            Field::TrailingPe => self.trailing_pe,
            Field::PriceToSalesTrailing12Months => self.price_to_sales_trailing12_months,
            Field::FiveYearAvgDividendYield => self.five_year_avg_dividend_yield,
            Field::PayoutRatio => self.payout_ratio,
            Field::FloatShares => self.float_shares,
            Field::EnterpriseToRevenue => self.enterprise_to_revenue,
            Field::EnterpriseToEbitda => self.enterprise_to_ebitda,
            Field::BookValue => self.book_value,
            Field::DebtToEquity => self.debt_to_equity,
            Field::GrossProfits => self.gross_profits,
            Field::EarningsGrowth => self.earnings_growth,
        }
    }

    /// Stores `value` for `field`; non-finite numbers are stored as missing.
    pub fn set(&mut self, field: Field, value: Option<f64>) {
        let value = value.filter(|v| v.is_finite());
        let slot = match field {
            Field::PreviousClose => &mut self.previous_close,
            Field::FiftyTwoWeekLow => &mut self.fifty_two_week_low,
            Field::FiftyTwoWeekHigh => &mut self.fifty_two_week_high,
            Field::Beta => &mut self.beta,
            Field::QuickRatio => &mut self.quick_ratio,
            Field::CurrentRatio => &mut self.current_ratio,
            Field::ReturnOnAssets => &mut self.return_on_assets,
            Field::ReturnOnEquity => &mut self.return_on_equity,
            Field::PriceToBook => &mut self.price_to_book,
            Field::TrailingPe => &mut self.trailing_pe,
            Field::PriceToSalesTrailing12Months => &mut self.price_to_sales_trailing12_months,
            Field::FiveYearAvgDividendYield => &mut self.five_year_avg_dividend_yield,
            Field::PayoutRatio => &mut self.payout_ratio,
            Field::FloatShares => &mut self.float_shares,
            Field::EnterpriseToRevenue => &mut self.enterprise_to_revenue,
            Field::EnterpriseToEbitda => &mut self.enterprise_to_ebitda,
            Field::BookValue => &mut self.book_value,
            Field::DebtToEquity => &mut self.debt_to_equity,
            Field::GrossProfits => &mut self.gross_profits,
            Field::EarningsGrowth => &mut self.earnings_growth,
        };
        *slot = value;
    }

    /// Builder-style [`RawAttributes::set`] with a present value.
    pub fn with(mut self, field: Field, value: f64) -> Self {
        self.set(field, Some(value));
        self
    }

    pub fn present_count(&self) -> usize {
        Field::ALL
            .iter()
            .filter(|field| self.get(**field).is_some())
            .count()
    }

    pub fn is_all_missing(&self) -> bool {
        self.present_count() == 0
    }
}

/// Accepts numbers; anything else (null, strings, objects) becomes missing.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|v| v.is_finite()))
}

/// Symbol → attributes, in caller order.
///
/// Inserting a symbol that is already present replaces its attributes in
/// place, so every symbol has exactly one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeTable {
    rows: Vec<(Symbol, RawAttributes)>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, symbol: Symbol, attributes: RawAttributes) {
        match self.rows.iter_mut().find(|(existing, _)| *existing == symbol) {
            Some((_, slot)) => *slot = attributes,
            None => self.rows.push((symbol, attributes)),
        }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&RawAttributes> {
        self.rows
            .iter()
            .find(|(existing, _)| existing == symbol)
            .map(|(_, attributes)| attributes)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &RawAttributes)> {
        self.rows.iter().map(|(symbol, attributes)| (symbol, attributes))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.rows.iter().map(|(symbol, _)| symbol)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<(Symbol, RawAttributes)> for AttributeTable {
    fn from_iter<I: IntoIterator<Item = (Symbol, RawAttributes)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (symbol, attributes) in iter {
            table.insert(symbol, attributes);
        }
        table
    }
}

impl Serialize for AttributeTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for (symbol, attributes) in &self.rows {
            map.serialize_entry(symbol, attributes)?;
        }
        map.end()
    }
}

// Hand-written so that document order survives; a JSON object deserialized
// into a map type would come back sorted.
impl<'de> Deserialize<'de> for AttributeTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = AttributeTable;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping symbols to attribute objects")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut table = AttributeTable::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((symbol, attributes)) =
                    access.next_entry::<Symbol, RawAttributes>()?
                {
                    table.insert(symbol, attributes);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("valid symbol")
    }

    #[test]
    fn field_names_round_trip_through_from_str() {
        for field in Field::ALL {
            assert_eq!(field.as_str().parse::<Field>(), Ok(field));
        }
        assert!(matches!(
            "bogusRatio".parse::<Field>(),
            Err(CriteriaError::UnknownField { .. })
        ));
    }

    #[test]
    fn set_drops_non_finite_values() {
        let mut attributes = RawAttributes::missing();
        attributes.set(Field::Beta, Some(f64::NAN));
        attributes.set(Field::QuickRatio, Some(f64::INFINITY));
        attributes.set(Field::CurrentRatio, Some(1.4));

        assert_eq!(attributes.get(Field::Beta), None);
        assert_eq!(attributes.get(Field::QuickRatio), None);
        assert_eq!(attributes.get(Field::CurrentRatio), Some(1.4));
        assert_eq!(attributes.present_count(), 1);
    }

    #[test]
    fn deserializes_provider_names_and_tolerates_non_numeric_values() {
        let attributes: RawAttributes = serde_json::from_str(
            r#"{"trailingPE": 7.5, "priceToSalesTrailing12Months": 1.2,
                "beta": "n/a", "quickRatio": null, "unknownExtra": 3}"#,
        )
        .expect("lenient parse");

        assert_eq!(attributes.get(Field::TrailingPe), Some(7.5));
        assert_eq!(attributes.get(Field::PriceToSalesTrailing12Months), Some(1.2));
        assert_eq!(attributes.get(Field::Beta), None);
        assert_eq!(attributes.get(Field::QuickRatio), None);
    }

    #[test]
    fn table_insert_replaces_in_place() {
        let mut table = AttributeTable::new();
        table.insert(symbol("VALE3"), RawAttributes::missing());
        table.insert(symbol("PETR4"), RawAttributes::missing());
        table.insert(
            symbol("VALE3"),
            RawAttributes::missing().with(Field::Beta, 1.1),
        );

        let order: Vec<&str> = table.symbols().map(Symbol::as_str).collect();
        assert_eq!(order, vec!["VALE3", "PETR4"]);
        assert_eq!(
            table.get(&symbol("VALE3")).and_then(|a| a.get(Field::Beta)),
            Some(1.1)
        );
    }

    #[test]
    fn table_deserialization_keeps_document_order() {
        let table: AttributeTable = serde_json::from_str(
            r#"{"WEGE3": {"beta": 0.8}, "ABEV3": {}, "BBAS3": {"payoutRatio": 0.4}}"#,
        )
        .expect("table parses");

        let order: Vec<&str> = table.symbols().map(Symbol::as_str).collect();
        assert_eq!(order, vec!["WEGE3", "ABEV3", "BBAS3"]);
        assert!(table.get(&symbol("ABEV3")).expect("row").is_all_missing());
    }
}
