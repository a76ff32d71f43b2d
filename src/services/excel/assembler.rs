use chrono::{Local, NaiveDateTime};

use super::classifier::classify_columns;
use super::normalizer::{find_non_finite, normalize_grid};
use super::statistics::compute_statistics;
use super::types::{Classification, NormalizedSheet, RawGrid, SheetErrorPolicy, SheetSource};
use crate::error::{IngestError, Result};
use crate::models::{IngestDocument, SheetResult, Statistics};

/// Runs the per-sheet pipeline over every sheet of a workbook.
#[derive(Debug, Clone, Copy, Default)]
pub struct SheetAssembler {
    policy: SheetErrorPolicy,
}

impl SheetAssembler {
    pub fn new(policy: SheetErrorPolicy) -> Self {
        Self { policy }
    }

    pub fn assemble<S: SheetSource>(&self, source: &mut S, source_file: &str) -> Result<IngestDocument> {
        self.assemble_at(source, source_file, Local::now().naive_local())
    }

    /// Same as [`assemble`](Self::assemble) with an explicit generation time,
    /// which also anchors the trailing twelve-month window.
    pub fn assemble_at<S: SheetSource>(
        &self,
        source: &mut S,
        source_file: &str,
        generated_at: NaiveDateTime,
    ) -> Result<IngestDocument> {
        let start = std::time::Instant::now();
        let sheet_names = source.sheet_names();
        tracing::info!("Processing {} sheets from {}", sheet_names.len(), source_file);

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in &sheet_names {
            let span = tracing::info_span!("sheet", name = %name);
            let _enter = span.enter();

            let grid = match source.grid(name) {
                Ok(grid) => grid,
                Err(e) if self.policy == SheetErrorPolicy::Skip => {
                    tracing::warn!("Skipping sheet: {}", e);
                    continue;
                }
                Err(e) => {
                    tracing::error!("Aborting run: {}", e);
                    return Err(match e {
                        err @ IngestError::SheetProcessing { .. } => err,
                        other => IngestError::SheetProcessing {
                            sheet: name.clone(),
                            reason: other.to_string(),
                        },
                    });
                }
            };

            let sheet = build_sheet(name, &grid, generated_at);
            tracing::info!(
                "Registros: {}, colunas: {}",
                sheet.total_records,
                sheet.columns.len()
            );
            sheets.push(sheet);
        }

        let document = IngestDocument {
            sheets,
            last_updated: generated_at,
            source_file: source_file.to_string(),
        };
        ensure_serializable(&document)?;

        tracing::info!(
            "Processed {} sheets in {:?}",
            document.sheets.len(),
            start.elapsed()
        );
        Ok(document)
    }
}

fn build_sheet(name: &str, grid: &RawGrid, generated_at: NaiveDateTime) -> SheetResult {
    let normalized = normalize_grid(grid);
    let roles = classify_columns(&normalized.columns);
    sheet_result(name, normalized, roles, generated_at)
}

/// A statistics failure never drops the sheet; it is kept with empty
/// statistics.
fn sheet_result(
    name: &str,
    normalized: NormalizedSheet,
    roles: Classification,
    generated_at: NaiveDateTime,
) -> SheetResult {
    let statistics = match compute_statistics(&normalized, &roles, generated_at) {
        Ok(stats) => {
            tracing::debug!("Computed statistics for {}", name);
            stats
        }
        Err(e) => {
            tracing::warn!("Statistics failed, keeping the sheet without them: {}", e);
            Statistics::default()
        }
    };

    SheetResult {
        name: name.to_string(),
        total_records: normalized.records.len(),
        columns: normalized.columns,
        records: normalized.records,
        column_mapping: roles.mapping,
        statistics,
    }
}

/// Checks that nothing in the document would serialize as NaN or Infinity.
pub fn ensure_serializable(document: &IngestDocument) -> Result<()> {
    for sheet in &document.sheets {
        if let Some((row, column)) = find_non_finite(&sheet.records) {
            return Err(IngestError::SerializationInvariant {
                sheet: sheet.name.clone(),
                column,
                row,
            });
        }
    }
    Ok(())
}
