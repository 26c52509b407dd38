//! Contact-history export rendering: page rows to CSV and object keys.

use chrono::{DateTime, Utc};

use crate::workbook::WorkbookRow;

/// Date written into the export column, `M/D/YYYY` without padding.
pub fn export_date(now: DateTime<Utc>) -> String {
    now.format("%-m/%-d/%Y").to_string()
}

/// Cell values of each row with the last cell replaced by `export_date`.
pub fn stamp_rows(rows: &[WorkbookRow], export_date: &str) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            let mut cells = row.cells.clone();
            if let Some(last) = cells.last_mut() {
                *last = export_date.to_string();
            }
            cells
        })
        .collect()
}

pub fn render_csv(header: &[String], rows: &[Vec<String>]) -> Result<Vec<u8>, String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(header)
        .map_err(|error| format!("Failed to write CSV header: {error}"))?;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|error| format!("Failed to write CSV row: {error}"))?;
    }
    writer
        .into_inner()
        .map_err(|error| format!("Failed to flush CSV writer: {error}"))
}

/// `<prefix>/YYYY/MM/DD/<epoch-millis>-<page>.csv`, one object per page of
/// a run started at `run_time`.
pub fn export_object_key(base_prefix: &str, run_time: DateTime<Utc>, page: usize) -> String {
    let trimmed = base_prefix.trim_matches('/');
    let path = format!(
        "{}/{}-{page:04}.csv",
        run_time.format("%Y/%m/%d"),
        run_time.timestamp_millis()
    );
    if trimmed.is_empty() {
        path
    } else {
        format!("{trimmed}/{path}")
    }
}

pub fn export_summary(rows_exported: usize) -> String {
    if rows_exported == 0 {
        "No contact history records to export".to_string()
    } else {
        format!("Exported {rows_exported} row(s) of contact history")
    }
}
