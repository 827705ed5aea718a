use std::path::Path;

use ratiorank_core::{
    AttributeTable, CriteriaSet, EnvelopeError, ProviderId, RankedRow, Ranking, RankingEngine,
    RawAttributes, Symbol,
};
use serde_json::{json, Value};

use super::{build_collector, parse_symbols, CommandResult};
use crate::cli::{Cli, RankArgs};
use crate::error::CliError;
use crate::output::{format_number, TextTable};

pub async fn run(args: &RankArgs, cli: &Cli) -> Result<CommandResult, CliError> {
    let criteria = match &args.criteria {
        Some(codes) => CriteriaSet::select(codes)?,
        None => CriteriaSet::standard(),
    };
    let symbols = parse_symbols(&args.symbols)?;

    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    let (table, provider, latency_ms, generated_at) = match &args.input {
        Some(path) => {
            let loaded = load_attribute_table(path)?;
            tracing::debug!(path = %path.display(), symbols = loaded.len(), "loaded attribute table");
            let table = if symbols.is_empty() {
                loaded
            } else {
                restrict_to(&loaded, &symbols, &mut warnings)
            };
            (table, ProviderId::Fixture, 0, None)
        }
        None => {
            let collector = build_collector(cli, &args.collect)?;
            let collection = collector.collect(&symbols).await;
            for failure in &collection.failures {
                warnings.push(failure.to_string());
                errors.push(EnvelopeError::collector_failure(failure, collection.provider));
            }
            (
                collection.table,
                collection.provider,
                collection.latency_ms,
                Some(collection.as_of),
            )
        }
    };

    let engine = RankingEngine::new(criteria);
    let mut ranking = engine.rank(&table);
    if let Some(top) = args.top {
        ranking = ranking.top(top);
    }

    let codes: Vec<&str> = engine.criteria().codes();
    let records: Vec<Value> = ranking
        .rows()
        .iter()
        .enumerate()
        .map(|(index, row)| row_view(index + 1, row, args.explain))
        .collect();
    let data = json!({
        "criteria": codes,
        "rows": records,
    });
    let table_view = ranking_table(&ranking, &codes, args.explain);

    let mut result = CommandResult::ok(data, table_view, provider)
        .with_records(records)
        .with_warnings(warnings)
        .with_errors(errors)
        .with_latency(latency_ms);
    if let Some(generated_at) = generated_at {
        result = result.with_generated_at(generated_at);
    }
    Ok(result)
}

/// Reads a `{ "SYMBOL": { attributes } }` JSON document, keeping file order.
pub(crate) fn load_attribute_table(path: &Path) -> Result<AttributeTable, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::InputIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str::<AttributeTable>(&raw).map_err(|source| CliError::InvalidInput {
        path: path.to_path_buf(),
        source,
    })
}

/// Keeps only `symbols`, in their order. Symbols match file keys ignoring
/// ASCII case; symbols absent from the file get an all-missing row and a
/// warning.
fn restrict_to(
    loaded: &AttributeTable,
    symbols: &[Symbol],
    warnings: &mut Vec<String>,
) -> AttributeTable {
    let mut table = AttributeTable::with_capacity(symbols.len());
    for symbol in symbols {
        let found = loaded.get(symbol).or_else(|| {
            loaded
                .iter()
                .find(|(key, _)| key.as_str().eq_ignore_ascii_case(symbol.as_str()))
                .map(|(_, attributes)| attributes)
        });
        match found {
            Some(attributes) => table.insert(symbol.clone(), attributes.clone()),
            None => {
                warnings.push(format!("{symbol}: not present in input file"));
                table.insert(symbol.clone(), RawAttributes::missing());
            }
        }
    }
    table
}

fn row_view(position: usize, row: &RankedRow, explain: bool) -> Value {
    let ranks: Vec<Value> = row
        .ranks
        .iter()
        .map(|entry| {
            if explain {
                json!({"code": entry.code, "rank": entry.rank, "value": entry.value})
            } else {
                json!({"code": entry.code, "rank": entry.rank})
            }
        })
        .collect();

    json!({
        "position": position,
        "symbol": row.symbol,
        "total": row.total,
        "ranks": ranks,
    })
}

fn ranking_table(ranking: &Ranking, codes: &[&str], explain: bool) -> TextTable {
    let mut headers = vec![String::from("#"), String::from("symbol"), String::from("total")];
    headers.extend(codes.iter().map(|code| (*code).to_owned()));
    let mut table = TextTable::new(headers);

    for (index, row) in ranking.rows().iter().enumerate() {
        let mut cells = vec![
            (index + 1).to_string(),
            row.symbol.to_string(),
            format!("{:.1}", row.total),
        ];
        cells.extend(row.ranks.iter().map(|entry| {
            if explain {
                format!("{:.1} ({})", entry.rank, format_number(entry.value, 4))
            } else {
                format!("{:.1}", entry.rank)
            }
        }));
        table.push_row(cells);
    }

    table
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use ratiorank_core::Field;

    use super::*;

    fn write_input(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write input");
        file
    }

    #[test]
    fn input_file_keeps_document_order() {
        let file = write_input(
            r#"{
                "VALE3": {"quickRatio": 1.2, "beta": 0.9},
                "PETR4": {"quickRatio": 0.8},
                "ITUB4": {}
            }"#,
        );

        let table = load_attribute_table(file.path()).expect("valid input");

        let symbols: Vec<&str> = table.symbols().map(Symbol::as_str).collect();
        assert_eq!(symbols, vec!["VALE3", "PETR4", "ITUB4"]);
        let vale = table
            .get(&Symbol::parse("VALE3").expect("symbol"))
            .expect("row");
        assert_eq!(vale.get(Field::QuickRatio), Some(1.2));
        assert_eq!(vale.get(Field::CurrentRatio), None);
    }

    #[test]
    fn malformed_input_maps_to_invalid_input() {
        let file = write_input("[1, 2, 3]");

        let error = load_attribute_table(file.path()).expect_err("must reject arrays");
        assert!(matches!(error, CliError::InvalidInput { .. }));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn missing_input_file_maps_to_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = load_attribute_table(&dir.path().join("absent.json"))
            .expect_err("file does not exist");
        assert!(matches!(error, CliError::InputIo { .. }));
        assert_eq!(error.exit_code(), 10);
    }

    #[test]
    fn restriction_follows_requested_order_and_warns_on_unknown_symbols() {
        let loaded: AttributeTable = [
            (
                Symbol::parse("A").expect("symbol"),
                RawAttributes::missing().with(Field::Beta, 1.0),
            ),
            (
                Symbol::parse("B").expect("symbol"),
                RawAttributes::missing().with(Field::Beta, 2.0),
            ),
        ]
        .into_iter()
        .collect();
        let requested = vec![
            Symbol::parse("B").expect("symbol"),
            Symbol::parse("Z").expect("symbol"),
        ];
        let mut warnings = Vec::new();

        let table = restrict_to(&loaded, &requested, &mut warnings);

        let symbols: Vec<&str> = table.symbols().map(Symbol::as_str).collect();
        assert_eq!(symbols, vec!["B", "Z"]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Z"));
        assert!(table
            .get(&Symbol::parse("Z").expect("symbol"))
            .expect("row")
            .is_all_missing());
    }

    #[test]
    fn restriction_matches_file_keys_ignoring_case() {
        let loaded: AttributeTable = [(
            Symbol::parse("PETR4").expect("symbol"),
            RawAttributes::missing().with(Field::QuickRatio, 0.8),
        )]
        .into_iter()
        .collect();
        let requested = vec![Symbol::parse("petr4").expect("symbol")];
        let mut warnings = Vec::new();

        let table = restrict_to(&loaded, &requested, &mut warnings);

        assert!(warnings.is_empty());
        let row = table.get(&requested[0]).expect("row");
        assert_eq!(row.get(Field::QuickRatio), Some(0.8));
    }

    #[test]
    fn table_view_shows_values_only_when_explaining() {
        let table: AttributeTable = [
            (
                Symbol::parse("A").expect("symbol"),
                RawAttributes::missing().with(Field::QuickRatio, 2.0),
            ),
            (Symbol::parse("B").expect("symbol"), RawAttributes::missing()),
        ]
        .into_iter()
        .collect();
        let engine = RankingEngine::new(CriteriaSet::select(&["QR"]).expect("known code"));
        let ranking = engine.rank(&table);

        let plain = row_view(1, &ranking.rows()[0], false);
        assert!(plain["ranks"][0].get("value").is_none());

        let explained = row_view(1, &ranking.rows()[0], true);
        assert_eq!(explained["ranks"][0]["value"], json!(2.0));
        assert_eq!(explained["symbol"], json!("A"));
        assert_eq!(explained["position"], json!(1));

        let missing = row_view(2, &ranking.rows()[1], true);
        assert!(missing["ranks"][0]["value"].is_null());
    }
}
