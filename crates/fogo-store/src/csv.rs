// Minimal CSV loader: comma-separated, first line is the header, no
// quoting or escaping.

use std::fs;
use std::path::Path;

use fogo::{ColumnData, StoreError, Table};

/// Read a CSV file into a columnar table. Each column's type is inferred
/// from its cells: Int if every cell parses as an integer, Real if every
/// cell parses as a number, Text otherwise. An empty column is Text.
pub fn read_csv(path: &Path) -> Result<Table, StoreError> {
    let text = fs::read_to_string(path)
        .map_err(|e| StoreError::new(format!("cannot read {}: {e}", path.display())))?;

    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| StoreError::new(format!("{}: empty file", path.display())))?;
    let names: Vec<String> = header.split(',').map(|s| s.trim().to_string()).collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
    for (lineno, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != names.len() {
            return Err(StoreError::new(format!(
                "{}: line {} has {} fields, expected {}",
                path.display(),
                lineno + 2,
                fields.len(),
                names.len()
            )));
        }
        for (col, field) in fields.iter().enumerate() {
            cells[col].push(field.trim().to_string());
        }
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, values)| (name, infer_column(values)))
        .collect();
    Ok(Table::from_columns(columns))
}

fn infer_column(values: Vec<String>) -> ColumnData {
    if !values.is_empty() && values.iter().all(|v| v.parse::<i64>().is_ok()) {
        return ColumnData::Int(values.iter().map(|v| v.parse().unwrap()).collect());
    }
    if !values.is_empty() && values.iter().all(|v| v.parse::<f64>().is_ok()) {
        return ColumnData::Real(values.iter().map(|v| v.parse().unwrap()).collect());
    }
    ColumnData::Text(values)
}
