//! Workbook builders shared by tests.

use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

use super::types::{RawCell, RawGrid, SheetSource};
use crate::error::{IngestError, Result};

pub enum Cell {
    S(&'static str),
    N(f64),
    D(u16, u8, u8),
    E,
}

/// Builds an in-memory `.xlsx` with the given sheets, row 0 being the header.
pub fn workbook_bytes(sheets: &[(&str, Vec<Vec<Cell>>)]) -> Vec<u8> {
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let mut workbook = Workbook::new();

    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match cell {
                    Cell::S(s) => {
                        worksheet.write_string(r, c, *s).unwrap();
                    }
                    Cell::N(n) => {
                        worksheet.write_number(r, c, *n).unwrap();
                    }
                    Cell::D(y, m, d) => {
                        let date = ExcelDateTime::from_ymd(*y, *m, *d).unwrap();
                        worksheet
                            .write_datetime_with_format(r, c, &date, &date_format)
                            .unwrap();
                    }
                    Cell::E => {}
                }
            }
        }
    }

    workbook.save_to_buffer().unwrap()
}

/// Sheet source backed by prepared grids. `None` simulates a sheet the
/// container declares but cannot deliver.
#[derive(Default)]
pub struct MemoryWorkbook {
    pub sheets: Vec<(String, Option<RawGrid>)>,
}

impl MemoryWorkbook {
    pub fn with_sheet(mut self, name: &str, header: &[&str], rows: Vec<Vec<RawCell>>) -> Self {
        let header = header.iter().map(|h| RawCell::Text(h.to_string())).collect();
        self.sheets.push((name.to_string(), Some(RawGrid { header, rows })));
        self
    }

    pub fn with_broken_sheet(mut self, name: &str) -> Self {
        self.sheets.push((name.to_string(), None));
        self
    }
}

impl SheetSource for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn grid(&mut self, name: &str) -> Result<RawGrid> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, grid)| grid.clone())
            .ok_or_else(|| IngestError::SheetProcessing {
                sheet: name.to_string(),
                reason: "worksheet part is missing".to_string(),
            })
    }
}
