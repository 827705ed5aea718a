use ratiorank_core::{AttributeTable, EnvelopeError, Field};
use serde_json::{json, Value};

use super::{build_collector, parse_symbols, CommandResult};
use crate::cli::{Cli, FetchArgs};
use crate::error::CliError;
use crate::output::{format_number, TextTable};

pub async fn run(args: &FetchArgs, cli: &Cli) -> Result<CommandResult, CliError> {
    let symbols = parse_symbols(&args.symbols)?;
    let collector = build_collector(cli, &args.collect)?;
    let collection = collector.collect(&symbols).await;

    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    for failure in &collection.failures {
        warnings.push(failure.to_string());
        errors.push(EnvelopeError::collector_failure(failure, collection.provider));
    }

    let records = attribute_records(&collection.table);
    let data = json!({
        "attributes": collection.table,
        "failures": collection.failures,
    });
    let table = attribute_table_view(&collection.table);

    Ok(CommandResult::ok(data, table, collection.provider)
        .with_records(records)
        .with_warnings(warnings)
        .with_errors(errors)
        .with_latency(collection.latency_ms)
        .with_generated_at(collection.as_of))
}

fn attribute_records(table: &AttributeTable) -> Vec<Value> {
    table
        .iter()
        .map(|(symbol, attributes)| json!({"symbol": symbol, "attributes": attributes}))
        .collect()
}

fn attribute_table_view(table: &AttributeTable) -> TextTable {
    let mut headers = vec![String::from("symbol")];
    headers.extend(Field::ALL.iter().map(|field| field.as_str().to_owned()));
    let mut view = TextTable::new(headers);

    for (symbol, attributes) in table.iter() {
        let mut cells = vec![symbol.to_string()];
        cells.extend(
            Field::ALL
                .iter()
                .map(|field| format_number(attributes.get(*field), 4)),
        );
        view.push_row(cells);
    }

    view
}

#[cfg(test)]
mod tests {
    use ratiorank_core::{RawAttributes, Symbol};

    use super::*;

    #[test]
    fn one_record_per_symbol_in_collection_order() {
        let table: AttributeTable = [
            (
                Symbol::parse("VALE3").expect("symbol"),
                RawAttributes::missing().with(Field::Beta, 0.7),
            ),
            (Symbol::parse("PETR4").expect("symbol"), RawAttributes::missing()),
        ]
        .into_iter()
        .collect();

        let records = attribute_records(&table);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["symbol"], json!("VALE3"));
        assert_eq!(records[0]["attributes"]["beta"], json!(0.7));
        assert_eq!(records[1]["symbol"], json!("PETR4"));
    }

    #[test]
    fn table_view_has_a_column_per_field() {
        let table: AttributeTable = [(
            Symbol::parse("ITUB4").expect("symbol"),
            RawAttributes::missing().with(Field::QuickRatio, 1.5),
        )]
        .into_iter()
        .collect();

        let mut rendered = Vec::new();
        attribute_table_view(&table)
            .write_to(&mut rendered)
            .expect("render");
        let rendered = String::from_utf8(rendered).expect("utf8");

        assert!(rendered.starts_with("symbol"));
        assert!(rendered.contains("quickRatio"));
        assert!(rendered.contains("1.5000"));
    }
}
