use chrono::{Datelike, Duration, NaiveDateTime};
use indexmap::IndexMap;

use super::types::{Classification, NormalizedSheet};
use super::utils::parse_date_string;
use crate::error::{IngestError, Result};
use crate::models::{CellValue, FrequencyTable, PeriodTable, Statistics};

const TOP_N: usize = 10;
const TRAILING_WINDOW_DAYS: i64 = 365;

/// Values of one column across all records. Records missing the key count as
/// null.
fn column_values<'a>(sheet: &'a NormalizedSheet, column: &str) -> Result<Vec<&'a CellValue>> {
    if !sheet.columns.iter().any(|c| c == column) {
        return Err(IngestError::UnknownColumn {
            column: column.to_string(),
        });
    }
    Ok(sheet
        .records
        .iter()
        .map(|record| record.get(column).unwrap_or(&CellValue::Null))
        .collect())
}

/// Counts per category, highest first. Equal counts keep first-seen order.
pub fn frequency_table(values: &[&CellValue], include_null: bool) -> FrequencyTable {
    let mut counts: IndexMap<String, u64> = IndexMap::new();
    for value in values {
        if value.is_null() && !include_null {
            continue;
        }
        *counts.entry(value.category_key()).or_insert(0) += 1;
    }

    let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.into_iter().collect()
}

pub fn top_n(values: &[&CellValue], n: usize) -> FrequencyTable {
    frequency_table(values, false).into_iter().take(n).collect()
}

/// `(non_null, null)` counts.
fn presence_counts(values: &[&CellValue]) -> (u64, u64) {
    let present = values.iter().filter(|v| !v.is_null()).count() as u64;
    (present, values.len() as u64 - present)
}

#[derive(Debug, Default, PartialEq)]
struct TemporalStats {
    monthly: PeriodTable,
    yearly: PeriodTable,
    last_12_months: PeriodTable,
}

fn parse_contact_date(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::Text(s) => parse_date_string(s),
        _ => None,
    }
}

/// Month/year buckets over the parseable contact dates. `None` when no value
/// parses.
fn temporal_stats(values: &[&CellValue], now: NaiveDateTime) -> Result<Option<TemporalStats>> {
    let cutoff = now
        .checked_sub_signed(Duration::days(TRAILING_WINDOW_DAYS))
        .ok_or_else(|| IngestError::TemporalWindow {
            evaluated_at: now.to_string(),
        })?;

    let present: Vec<&CellValue> = values.iter().copied().filter(|v| !v.is_null()).collect();
    let dates: Vec<NaiveDateTime> = present.iter().filter_map(|v| parse_contact_date(v)).collect();

    let dropped = present.len() - dates.len();
    if dropped > 0 {
        tracing::warn!(
            "Dropped {} of {} contact dates that could not be parsed",
            dropped,
            present.len()
        );
    }
    if dates.is_empty() {
        return Ok(None);
    }

    let mut stats = TemporalStats::default();
    for date in &dates {
        let month = format!("{:04}-{:02}", date.year(), date.month());
        if *date >= cutoff {
            *stats.last_12_months.entry(month.clone()).or_insert(0) += 1;
        }
        *stats.monthly.entry(month).or_insert(0) += 1;
        *stats.yearly.entry(format!("{:04}", date.year())).or_insert(0) += 1;
    }
    Ok(Some(stats))
}

/// Computes every statistic whose column role is mapped.
///
/// `now` is the evaluation time for the trailing twelve-month window. A
/// failure inside the temporal block only drops the temporal keys.
pub fn compute_statistics(
    sheet: &NormalizedSheet,
    roles: &Classification,
    now: NaiveDateTime,
) -> Result<Statistics> {
    let mapping = &roles.mapping;
    let mut stats = Statistics::default();

    if let Some(column) = &mapping.tipo {
        stats.by_kind = Some(frequency_table(&column_values(sheet, column)?, true));
    }

    if let Some(column) = &mapping.cidade {
        stats.top_cities = Some(top_n(&column_values(sheet, column)?, TOP_N));
    }

    if let Some(column) = &mapping.data_contato {
        let values = column_values(sheet, column)?;
        let (done, pending) = presence_counts(&values);
        stats.contacts_done = Some(done);
        stats.contacts_pending = Some(pending);

        match temporal_stats(&values, now) {
            Ok(Some(temporal)) => {
                stats.monthly = Some(temporal.monthly);
                stats.yearly = Some(temporal.yearly);
                if !temporal.last_12_months.is_empty() {
                    stats.last_12_months = Some(temporal.last_12_months);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Skipping temporal statistics: {}", e),
        }
    }

    if let Some(column) = &mapping.contrato {
        let (with, without) = presence_counts(&column_values(sheet, column)?);
        stats.with_contract = Some(with);
        stats.without_contract = Some(without);
    }

    if let Some(column) = &mapping.grupo {
        stats.top_groups = Some(top_n(&column_values(sheet, column)?, TOP_N));
    }

    if let Some(column) = &roles.parking_operation {
        stats.parking_operation = Some(frequency_table(&column_values(sheet, column)?, false));
    }

    if let Some(column) = &roles.parking_billing {
        stats.parking_billing = Some(frequency_table(&column_values(sheet, column)?, false));
    }

    Ok(stats)
}
