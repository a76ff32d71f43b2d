use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Sheets, Xls, Xlsx};
use tempfile::NamedTempFile;

use super::types::{RawCell, RawGrid, SheetSource};
use super::utils::{excel_serial_to_datetime, parse_date_string, supported_extension};
use crate::error::{IngestError, Result};

/// An opened workbook. Uploads are decoded from a scratch copy that lives
/// exactly as long as the reader.
pub struct WorkbookReader {
    // Declared before `scratch` so the file handle closes before deletion.
    workbook: Sheets<BufReader<File>>,
    file: String,
    scratch: Option<NamedTempFile>,
}

impl std::fmt::Debug for WorkbookReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkbookReader")
            .field("file", &self.file)
            .field("scratch", &self.scratch.as_ref().map(|s| s.path().to_path_buf()))
            .finish()
    }
}

fn unreadable(file: &str, reason: impl ToString) -> IngestError {
    IngestError::UnreadableWorkbook {
        file: file.to_string(),
        reason: reason.to_string(),
    }
}

fn open_sheets(path: &Path, extension: &str, file: &str) -> Result<Sheets<BufReader<File>>> {
    let workbook = match extension {
        "xlsx" => open_workbook::<Xlsx<_>, _>(path).map(Sheets::Xlsx).map_err(|e| unreadable(file, e)),
        "xls" => open_workbook::<Xls<_>, _>(path).map(Sheets::Xls).map_err(|e| unreadable(file, e)),
        other => Err(unreadable(file, format!("unsupported extension '{}'", other))),
    };
    if let Err(e) = &workbook {
        tracing::error!("Failed to open workbook: {}", e);
    }
    workbook
}

impl WorkbookReader {
    /// Opens a workbook on disk. The file is only read.
    pub fn open(path: &Path) -> Result<Self> {
        let file = path.display().to_string();
        let extension = supported_extension(&file)
            .ok_or_else(|| unreadable(&file, "expected a .xlsx or .xls file"))?;
        let workbook = open_sheets(path, &extension, &file)?;
        Ok(Self {
            workbook,
            file,
            scratch: None,
        })
    }

    /// Decodes an uploaded workbook through a temporary copy. The copy is
    /// removed when the reader is dropped, or right away if decoding fails.
    pub fn from_upload(bytes: &[u8], file_name: &str) -> Result<Self> {
        let extension = supported_extension(file_name)
            .ok_or_else(|| unreadable(file_name, "expected a .xlsx or .xls file"))?;

        let mut scratch = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&format!(".{}", extension))
            .tempfile()?;
        scratch.write_all(bytes)?;
        scratch.flush()?;
        tracing::debug!(
            "Wrote {}KB upload to {}",
            bytes.len() / 1024,
            scratch.path().display()
        );

        let workbook = open_sheets(scratch.path(), &extension, file_name)?;
        Ok(Self {
            workbook,
            file: file_name.to_string(),
            scratch: Some(scratch),
        })
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    #[cfg(test)]
    pub fn scratch_path(&self) -> Option<std::path::PathBuf> {
        self.scratch.as_ref().map(|s| s.path().to_path_buf())
    }
}

fn raw_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty | Data::Error(_) => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Int(i) => RawCell::Int(*i),
        Data::Float(f) => RawCell::Float(*f),
        Data::Bool(b) => RawCell::Bool(*b),
        Data::DateTime(dt) => RawCell::DateTime(excel_serial_to_datetime(dt.as_f64())),
        Data::DateTimeIso(s) => RawCell::DateTime(parse_date_string(s)),
        Data::DurationIso(s) => RawCell::Text(s.clone()),
    }
}

fn range_to_grid(range: &Range<Data>) -> RawGrid {
    let mut rows = range.rows();
    let header = rows
        .next()
        .map(|row| row.iter().map(raw_cell).collect())
        .unwrap_or_default();
    let rows = rows.map(|row| row.iter().map(raw_cell).collect()).collect();
    RawGrid { header, rows }
}

impl SheetSource for WorkbookReader {
    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    fn grid(&mut self, name: &str) -> Result<RawGrid> {
        let range = self
            .workbook
            .worksheet_range(name)
            .map_err(|e| IngestError::SheetProcessing {
                sheet: name.to_string(),
                reason: e.to_string(),
            })?;
        let grid = range_to_grid(&range);
        tracing::debug!(
            "Read sheet {} with {} columns and {} rows",
            name,
            grid.header.len(),
            grid.rows.len()
        );
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::excel::fixtures::{workbook_bytes, Cell};
    use chrono::NaiveDate;

    #[test]
    fn test_reads_sheets_in_order_with_typed_cells() {
        let bytes = workbook_bytes(&[
            (
                "Hospitais SP",
                vec![
                    vec![Cell::S("Nome"), Cell::S("Leitos"), Cell::S("Data Contato")],
                    vec![Cell::S("Hospital A"), Cell::N(120.0), Cell::D(2023, 1, 15)],
                ],
            ),
            ("Oportunidades", vec![vec![Cell::S("Empresa")]]),
        ]);
        let mut reader = WorkbookReader::from_upload(&bytes, "Lista.XLSX").unwrap();

        assert_eq!(reader.sheet_names(), vec!["Hospitais SP", "Oportunidades"]);
        let grid = reader.grid("Hospitais SP").unwrap();
        assert_eq!(grid.header.len(), 3);
        assert_eq!(grid.rows.len(), 1);
        assert_eq!(grid.rows[0][0], RawCell::Text("Hospital A".into()));
        assert_eq!(grid.rows[0][1], RawCell::Float(120.0));
        assert_eq!(
            grid.rows[0][2],
            RawCell::DateTime(NaiveDate::from_ymd_opt(2023, 1, 15).and_then(|d| d.and_hms_opt(0, 0, 0)))
        );
    }

    #[test]
    fn test_scratch_copy_is_removed_on_drop() {
        let bytes = workbook_bytes(&[("Plan1", vec![vec![Cell::S("Nome")]])]);
        let reader = WorkbookReader::from_upload(&bytes, "plan.xlsx").unwrap();
        let scratch = reader.scratch_path().unwrap();
        assert!(scratch.exists());
        drop(reader);
        assert!(!scratch.exists());
    }

    #[test]
    fn test_corrupted_upload_is_unreadable() {
        let err = WorkbookReader::from_upload(b"not a zip container", "lista.xlsx").unwrap_err();
        assert!(matches!(err, IngestError::UnreadableWorkbook { .. }));
    }

    #[test]
    fn test_truncated_upload_is_unreadable() {
        let bytes = workbook_bytes(&[("Plan1", vec![vec![Cell::S("Nome")]])]);
        let err = WorkbookReader::from_upload(&bytes[..bytes.len() / 2], "lista.xlsx").unwrap_err();
        assert!(matches!(err, IngestError::UnreadableWorkbook { .. }));
    }

    #[test]
    fn test_unsupported_extension_is_unreadable() {
        let err = WorkbookReader::from_upload(b"a,b\n1,2", "lista.csv").unwrap_err();
        assert!(matches!(err, IngestError::UnreadableWorkbook { .. }));
    }

    #[test]
    fn test_open_from_disk_leaves_file_untouched() {
        let bytes = workbook_bytes(&[("Plan1", vec![vec![Cell::S("Nome")], vec![Cell::S("A")]])]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lista.xlsx");
        std::fs::write(&path, &bytes).unwrap();

        let mut reader = WorkbookReader::open(&path).unwrap();
        assert_eq!(reader.grid("Plan1").unwrap().rows.len(), 1);
        drop(reader);
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_missing_sheet_is_a_sheet_error() {
        let bytes = workbook_bytes(&[("Plan1", vec![vec![Cell::S("Nome")]])]);
        let mut reader = WorkbookReader::from_upload(&bytes, "lista.xlsx").unwrap();
        let err = reader.grid("Inexistente").unwrap_err();
        assert!(matches!(err, IngestError::SheetProcessing { sheet, .. } if sheet == "Inexistente"));
    }
}
