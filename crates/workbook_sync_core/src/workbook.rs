//! Values exchanged with the workbook table store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Column identifier to cell fact.
pub type CellValues = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnRef {
    pub id: String,
    pub name: String,
}

/// A queried row: its identifier plus formatted cell values in column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkbookRow {
    pub row_id: String,
    pub cells: Vec<String>,
}

impl WorkbookRow {
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowPage {
    pub rows: Vec<WorkbookRow>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowQuery {
    pub table_id: String,
    pub formula: String,
    pub max_results: Option<usize>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCreate {
    pub batch_item_id: String,
    pub cells: CellValues,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpdate {
    pub row_id: String,
    pub cells: CellValues,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpsert {
    pub batch_item_id: String,
    pub formula: String,
    pub cells: CellValues,
}

/// A batch item the store rejected. `id` is the batch item id for creates
/// and upserts, the row id for updates and deletes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreFailure {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub failed: Vec<StoreFailure>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UpsertAction {
    Updated,
    Appended,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Batch item id and what the store did with it.
    pub rows: Vec<(String, UpsertAction)>,
    pub failed: Vec<StoreFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedImportOptions {
    pub delimiter: String,
    pub has_header_row: bool,
    pub ignore_empty_rows: bool,
}

impl Default for DelimitedImportOptions {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            has_header_row: true,
            ignore_empty_rows: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJobRequest {
    pub destination_table_id: String,
    pub data_source_url: String,
    pub client_request_token: String,
    pub options: DelimitedImportOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportJobStarted {
    pub job_id: String,
    pub job_status: String,
}
