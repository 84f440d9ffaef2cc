use csv::ReaderBuilder;

use crate::error::{EngineError, Result};
use crate::value::{FieldMap, Value};

/// Parses CSV with the first row as header; every subsequent row
/// becomes one mapping keyed by the header names. Cell values stay
/// strings. A syntax error on any row fails the whole parse with the
/// offending 1-based line number.
pub(super) fn parse(content: &str) -> Result<Vec<Value>> {
    let mut reader = ReaderBuilder::new().from_reader(content.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| EngineError::CsvRow { row: 1, source })?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|source| EngineError::CsvRow {
            row: idx + 2,
            source,
        })?;
        let mut map = FieldMap::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            map.insert(header.clone(), Value::Text(cell.to_string()));
        }
        rows.push(Value::Mapping(map));
    }
    Ok(rows)
}
