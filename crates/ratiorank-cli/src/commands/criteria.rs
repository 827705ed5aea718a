use ratiorank_core::{CriteriaSet, ProviderId};
use serde_json::{json, Value};

use super::CommandResult;
use crate::error::CliError;
use crate::output::TextTable;

pub fn run() -> Result<CommandResult, CliError> {
    let criteria = CriteriaSet::standard();

    let records: Vec<Value> = criteria
        .iter()
        .map(|spec| {
            json!({
                "code": spec.code,
                "name": spec.name,
                "derivation": spec.derivation,
                "direction": spec.direction,
                "missing": spec.missing,
            })
        })
        .collect();

    let mut table = TextTable::new(["code", "name", "derivation", "direction"]);
    for spec in criteria.iter() {
        table.push_row(vec![
            spec.code.clone(),
            spec.name.clone(),
            spec.derivation.to_string(),
            spec.direction.to_string(),
        ]);
    }

    let data = json!({ "criteria": records });
    Ok(CommandResult::ok(data, table, ProviderId::Yahoo).with_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_the_standard_criteria_in_order() {
        let result = run().expect("criteria listing never fails");

        let codes: Vec<&str> = result
            .records
            .iter()
            .filter_map(|record| record["code"].as_str())
            .collect();
        assert_eq!(codes, CriteriaSet::standard().codes());
        assert_eq!(result.records[0]["derivation"], json!("closeness_to_low"));
        assert_eq!(result.records[2]["derivation"], json!("field:quickRatio"));
        assert_eq!(result.records[2]["direction"], json!("descending"));
    }
}
