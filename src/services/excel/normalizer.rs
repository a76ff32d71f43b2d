use std::collections::HashSet;

use super::types::{NormalizedSheet, RawCell, RawGrid};
use super::utils::render_datetime;
use crate::models::{CellValue, Record};

/// Header label for a header cell. Blank headers get a positional name.
pub fn header_label(cell: &RawCell, index: usize) -> String {
    let label = match cell {
        RawCell::Text(s) => s.trim().to_string(),
        RawCell::Int(i) => i.to_string(),
        RawCell::Float(f) if f.is_finite() => f.to_string(),
        RawCell::Bool(b) => b.to_string(),
        RawCell::DateTime(Some(dt)) => render_datetime(dt),
        RawCell::Float(_) | RawCell::DateTime(None) | RawCell::Empty => String::new(),
    };
    if label.is_empty() {
        format!("Unnamed: {}", index)
    } else {
        label
    }
}

pub fn normalize_cell(cell: &RawCell) -> CellValue {
    match cell {
        RawCell::Empty => CellValue::Null,
        RawCell::Text(s) if s.is_empty() => CellValue::Null,
        RawCell::Text(s) => CellValue::Text(s.clone()),
        RawCell::Int(i) => CellValue::Int(*i),
        RawCell::Float(f) if f.is_finite() => CellValue::Float(*f),
        RawCell::Float(_) => CellValue::Null,
        RawCell::Bool(b) => CellValue::Bool(*b),
        RawCell::DateTime(Some(dt)) => CellValue::Text(render_datetime(dt)),
        RawCell::DateTime(None) => CellValue::Null,
    }
}

/// Turns a raw grid into trimmed column labels and one record per data row.
///
/// Labels that collide after trimming are kept twice in `columns`; the record
/// holds the first position with the value of the rightmost column.
pub fn normalize_grid(grid: &RawGrid) -> NormalizedSheet {
    let columns: Vec<String> = grid
        .header
        .iter()
        .enumerate()
        .map(|(idx, cell)| header_label(cell, idx))
        .collect();

    let mut seen = HashSet::new();
    for column in &columns {
        if !seen.insert(column.as_str()) {
            tracing::warn!(
                "Duplicate column label '{}' after trimming; the rightmost column's values are kept",
                column
            );
        }
    }

    let records = grid
        .rows
        .iter()
        .map(|row| {
            let mut record = Record::with_capacity(columns.len());
            for (idx, column) in columns.iter().enumerate() {
                let value = row.get(idx).map_or(CellValue::Null, normalize_cell);
                record.insert(column.clone(), value);
            }
            record
        })
        .collect();

    NormalizedSheet { columns, records }
}

/// First `(row, column)` holding a value that cannot be emitted as JSON.
pub fn find_non_finite(records: &[Record]) -> Option<(usize, String)> {
    records.iter().enumerate().find_map(|(row, record)| {
        record.iter().find_map(|(column, value)| match value {
            CellValue::Float(f) if !f.is_finite() => Some((row, column.clone())),
            _ => None,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    fn date(y: i32, m: u32, d: u32) -> RawCell {
        RawCell::DateTime(NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(0, 0, 0)))
    }

    #[test]
    fn test_headers_are_trimmed_and_blank_ones_named() {
        let grid = RawGrid {
            header: vec![text("  Nome "), RawCell::Empty, RawCell::Int(2024)],
            rows: vec![],
        };
        let sheet = normalize_grid(&grid);
        assert_eq!(sheet.columns, vec!["Nome", "Unnamed: 1", "2024"]);
        assert!(sheet.records.is_empty());
    }

    #[test]
    fn test_null_sentinels_become_null() {
        let grid = RawGrid {
            header: vec![text("a"), text("b"), text("c"), text("d"), text("e"), text("f")],
            rows: vec![vec![
                RawCell::Float(f64::NAN),
                RawCell::Float(f64::INFINITY),
                RawCell::Float(f64::NEG_INFINITY),
                RawCell::DateTime(None),
                RawCell::Empty,
                text(""),
            ]],
        };
        let sheet = normalize_grid(&grid);
        assert_eq!(sheet.records.len(), 1);
        assert!(sheet.records[0].values().all(CellValue::is_null));
        assert_eq!(sheet.records[0].len(), 6);
    }

    #[test]
    fn test_short_rows_are_padded_with_null() {
        let grid = RawGrid {
            header: vec![text("Nome"), text("Cidade")],
            rows: vec![vec![text("Hospital A")]],
        };
        let sheet = normalize_grid(&grid);
        assert_eq!(sheet.records[0]["Nome"], CellValue::Text("Hospital A".into()));
        assert_eq!(sheet.records[0]["Cidade"], CellValue::Null);
    }

    #[test]
    fn test_scalars_keep_native_type_and_dates_become_strings() {
        let grid = RawGrid {
            header: vec![text("Leitos"), text("Taxa"), text("Ativo"), text("Data")],
            rows: vec![vec![
                RawCell::Int(120),
                RawCell::Float(0.25),
                RawCell::Bool(true),
                date(2023, 1, 15),
            ]],
        };
        let record = &normalize_grid(&grid).records[0];
        assert_eq!(record["Leitos"], CellValue::Int(120));
        assert_eq!(record["Taxa"], CellValue::Float(0.25));
        assert_eq!(record["Ativo"], CellValue::Bool(true));
        assert_eq!(record["Data"], CellValue::Text("2023-01-15".into()));
    }

    #[test]
    fn test_records_follow_header_order() {
        let grid = RawGrid {
            header: vec![text("Z"), text("A"), text("M")],
            rows: vec![vec![RawCell::Int(1), RawCell::Int(2), RawCell::Int(3)]],
        };
        let record = &normalize_grid(&grid).records[0];
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Z", "A", "M"]);
    }

    #[test]
    fn test_duplicate_labels_keep_last_value() {
        let grid = RawGrid {
            header: vec![text("Nome"), text("Nome ")],
            rows: vec![vec![text("first"), text("second")]],
        };
        let sheet = normalize_grid(&grid);
        assert_eq!(sheet.columns, vec!["Nome", "Nome"]);
        assert_eq!(sheet.records[0].len(), 1);
        assert_eq!(sheet.records[0]["Nome"], CellValue::Text("second".into()));
    }

    #[test]
    fn test_normalized_records_are_always_finite() {
        let grid = RawGrid {
            header: vec![text("x")],
            rows: vec![vec![RawCell::Float(f64::NAN)], vec![RawCell::Float(1.5)]],
        };
        assert_eq!(find_non_finite(&normalize_grid(&grid).records), None);
    }

    #[test]
    fn test_find_non_finite_reports_position() {
        let mut record = Record::new();
        record.insert("ok".into(), CellValue::Int(1));
        record.insert("bad".into(), CellValue::Float(f64::NAN));
        let records = vec![Record::new(), record];
        assert_eq!(find_non_finite(&records), Some((1, "bad".to_string())));
    }
}
