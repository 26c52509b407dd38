use workbook_sync_core::workbook::{
    ColumnRef, ImportJobRequest, ImportJobStarted, RowCreate, RowPage, RowQuery, RowUpdate,
    RowUpsert, TableRef, UpsertOutcome, WriteOutcome,
};

/// Largest number of rows one batch request may carry.
pub const MAX_BATCH_ROWS: usize = 100;

/// Table operations of one workbook. Calls block until the remote round
/// trip completes; errors describe transport or request failures, while
/// per-item rejections come back inside the outcomes.
pub trait WorkbookStore {
    fn list_tables(&self) -> Result<Vec<TableRef>, String>;
    fn list_columns(&self, table_id: &str) -> Result<Vec<ColumnRef>, String>;
    fn query_rows(&self, query: &RowQuery) -> Result<RowPage, String>;
    fn batch_create_rows(&self, table_id: &str, rows: &[RowCreate]) -> Result<WriteOutcome, String>;
    fn batch_update_rows(&self, table_id: &str, rows: &[RowUpdate]) -> Result<WriteOutcome, String>;
    fn batch_delete_rows(&self, table_id: &str, row_ids: &[String]) -> Result<WriteOutcome, String>;
    fn batch_upsert_rows(&self, table_id: &str, rows: &[RowUpsert]) -> Result<UpsertOutcome, String>;
    fn start_import_job(&self, request: &ImportJobRequest) -> Result<ImportJobStarted, String>;
}
