//! In-memory adapters for exercising handlers without AWS.
//!
//! `InMemoryWorkbookStore` understands the filter formulas produced by
//! `workbook_sync_core::formula`, pages query results through snapshot
//! cursors, and can be told to reject specific batch items.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use workbook_sync_core::workbook::{
    CellValues, ColumnRef, ImportJobRequest, ImportJobStarted, RowCreate, RowPage, RowQuery,
    RowUpdate, RowUpsert, StoreFailure, TableRef, UpsertAction, UpsertOutcome, WorkbookRow,
    WriteOutcome,
};

use crate::adapters::object_store::ObjectStore;
use crate::adapters::workbook_store::WorkbookStore;

pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Query { table_id: String, formula: String },
    Create { table_id: String, batch_item_ids: Vec<String> },
    Update { table_id: String, row_ids: Vec<String> },
    Delete { table_id: String, row_ids: Vec<String> },
    Upsert { table_id: String, batch_item_ids: Vec<String> },
    ImportJob { table_id: String, client_request_token: String },
}

impl StoreCall {
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Query { .. })
    }
}

#[derive(Debug, Clone)]
struct FakeTable {
    id: String,
    name: String,
    columns: Vec<ColumnRef>,
    rows: Vec<WorkbookRow>,
}

impl FakeTable {
    fn column_index_by_name(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    fn apply_cells(&self, cells: &mut Vec<String>, values: &CellValues) {
        cells.resize(self.columns.len(), String::new());
        for (index, column) in self.columns.iter().enumerate() {
            if let Some(value) = values.get(&column.id) {
                cells[index] = value.clone();
            }
        }
    }
}

#[derive(Default)]
struct StoreState {
    tables: Vec<FakeTable>,
    cursors: HashMap<String, Vec<WorkbookRow>>,
    next_row: usize,
    next_cursor: usize,
    calls: Vec<StoreCall>,
    rejected_ids: HashSet<String>,
    page_size: Option<usize>,
    import_jobs: Vec<ImportJobRequest>,
}

impl StoreState {
    fn table(&self, table_id: &str) -> Result<&FakeTable, String> {
        self.tables
            .iter()
            .find(|table| table.id == table_id)
            .ok_or_else(|| format!("no table with id {table_id}"))
    }

    fn table_mut(&mut self, table_id: &str) -> Result<&mut FakeTable, String> {
        self.tables
            .iter_mut()
            .find(|table| table.id == table_id)
            .ok_or_else(|| format!("no table with id {table_id}"))
    }

    fn table_by_name(&self, name: &str) -> Option<&FakeTable> {
        self.tables.iter().find(|table| table.name == name)
    }

    fn allocate_row_id(&mut self) -> String {
        self.next_row += 1;
        format!("row-{}", self.next_row)
    }

    fn rejection(&self, id: &str) -> Option<StoreFailure> {
        self.rejected_ids.contains(id).then(|| StoreFailure {
            id: id.to_string(),
            message: format!("item {id} rejected"),
        })
    }
}

#[derive(Default)]
pub struct InMemoryWorkbookStore {
    state: Mutex<StoreState>,
}

impl InMemoryWorkbookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table whose column ids are `<table_id>-c<index>`.
    pub fn add_table(&self, name: &str, columns: &[&str]) -> String {
        let mut state = self.state.lock().expect("poisoned mutex");
        let id = format!("tbl-{}", state.tables.len() + 1);
        let columns = columns
            .iter()
            .enumerate()
            .map(|(index, column)| ColumnRef {
                id: format!("{id}-c{index}"),
                name: column.to_string(),
            })
            .collect();
        state.tables.push(FakeTable {
            id: id.clone(),
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        });
        id
    }

    pub fn insert_row(&self, table: &str, cells: &[&str]) -> String {
        let mut state = self.state.lock().expect("poisoned mutex");
        let row_id = state.allocate_row_id();
        let fake = state
            .tables
            .iter_mut()
            .find(|candidate| candidate.name == table)
            .expect("table should exist");
        let mut values: Vec<String> = cells.iter().map(|cell| cell.to_string()).collect();
        values.resize(fake.columns.len(), String::new());
        fake.rows.push(WorkbookRow {
            row_id: row_id.clone(),
            cells: values,
        });
        row_id
    }

    pub fn rows(&self, table: &str) -> Vec<WorkbookRow> {
        let state = self.state.lock().expect("poisoned mutex");
        state
            .table_by_name(table)
            .map(|fake| fake.rows.clone())
            .unwrap_or_default()
    }

    /// Row cells keyed by column name, for readable assertions.
    pub fn row_values(&self, table: &str, row_id: &str) -> Option<BTreeMap<String, String>> {
        let state = self.state.lock().expect("poisoned mutex");
        let fake = state.table_by_name(table)?;
        let row = fake.rows.iter().find(|row| row.row_id == row_id)?;
        Some(
            fake.columns
                .iter()
                .map(|column| column.name.clone())
                .zip(row.cells.iter().cloned())
                .collect(),
        )
    }

    pub fn find_row(&self, table: &str, column: &str, value: &str) -> Option<WorkbookRow> {
        let state = self.state.lock().expect("poisoned mutex");
        let fake = state.table_by_name(table)?;
        let index = fake.column_index_by_name(column)?;
        fake.rows
            .iter()
            .find(|row| row.cell(index) == Some(value))
            .cloned()
    }

    /// Makes batch writes report the item with this batch item id or row id
    /// as failed.
    pub fn reject_item(&self, id: &str) {
        self.state
            .lock()
            .expect("poisoned mutex")
            .rejected_ids
            .insert(id.to_string());
    }

    pub fn set_page_size(&self, page_size: usize) {
        self.state.lock().expect("poisoned mutex").page_size = Some(page_size);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().expect("poisoned mutex").calls.clone()
    }

    pub fn write_calls(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(StoreCall::is_write)
            .collect()
    }

    pub fn import_jobs(&self) -> Vec<ImportJobRequest> {
        self.state.lock().expect("poisoned mutex").import_jobs.clone()
    }
}

impl WorkbookStore for InMemoryWorkbookStore {
    fn list_tables(&self) -> Result<Vec<TableRef>, String> {
        let state = self.state.lock().expect("poisoned mutex");
        Ok(state
            .tables
            .iter()
            .map(|table| TableRef {
                id: table.id.clone(),
                name: table.name.clone(),
            })
            .collect())
    }

    fn list_columns(&self, table_id: &str) -> Result<Vec<ColumnRef>, String> {
        let state = self.state.lock().expect("poisoned mutex");
        Ok(state.table(table_id)?.columns.clone())
    }

    fn query_rows(&self, query: &RowQuery) -> Result<RowPage, String> {
        let mut state = self.state.lock().expect("poisoned mutex");
        state.calls.push(StoreCall::Query {
            table_id: query.table_id.clone(),
            formula: query.formula.clone(),
        });

        let page_size = query
            .max_results
            .or(state.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .max(1);

        let mut remaining = match &query.next_token {
            Some(token) => state
                .cursors
                .remove(token)
                .ok_or_else(|| format!("unknown continuation token {token}"))?,
            None => {
                let table = state.table(&query.table_id)?;
                let filter = ParsedFilter::parse(&query.formula)?;
                table
                    .rows
                    .iter()
                    .filter(|row| filter.matches(table, row))
                    .cloned()
                    .collect()
            }
        };

        let rest = if remaining.len() > page_size {
            remaining.split_off(page_size)
        } else {
            Vec::new()
        };
        let next_token = if rest.is_empty() {
            None
        } else {
            state.next_cursor += 1;
            let token = format!("cursor-{}", state.next_cursor);
            state.cursors.insert(token.clone(), rest);
            Some(token)
        };

        Ok(RowPage {
            rows: remaining,
            next_token,
        })
    }

    fn batch_create_rows(&self, table_id: &str, rows: &[RowCreate]) -> Result<WriteOutcome, String> {
        let mut state = self.state.lock().expect("poisoned mutex");
        state.calls.push(StoreCall::Create {
            table_id: table_id.to_string(),
            batch_item_ids: rows.iter().map(|row| row.batch_item_id.clone()).collect(),
        });
        state.table(table_id)?;

        let mut outcome = WriteOutcome::default();
        for row in rows {
            if let Some(failure) = state.rejection(&row.batch_item_id) {
                outcome.failed.push(failure);
                continue;
            }
            let row_id = state.allocate_row_id();
            let table = state.table_mut(table_id)?;
            let mut cells = Vec::new();
            table.apply_cells(&mut cells, &row.cells);
            table.rows.push(WorkbookRow { row_id, cells });
        }
        Ok(outcome)
    }

    fn batch_update_rows(&self, table_id: &str, rows: &[RowUpdate]) -> Result<WriteOutcome, String> {
        let mut state = self.state.lock().expect("poisoned mutex");
        state.calls.push(StoreCall::Update {
            table_id: table_id.to_string(),
            row_ids: rows.iter().map(|row| row.row_id.clone()).collect(),
        });
        state.table(table_id)?;

        let mut outcome = WriteOutcome::default();
        for update in rows {
            if let Some(failure) = state.rejection(&update.row_id) {
                outcome.failed.push(failure);
                continue;
            }
            let table = state.table_mut(table_id)?;
            let Some(index) = table.rows.iter().position(|row| row.row_id == update.row_id) else {
                outcome.failed.push(StoreFailure {
                    id: update.row_id.clone(),
                    message: "row does not exist".to_string(),
                });
                continue;
            };
            let mut cells = table.rows[index].cells.clone();
            table.apply_cells(&mut cells, &update.cells);
            table.rows[index].cells = cells;
        }
        Ok(outcome)
    }

    fn batch_delete_rows(&self, table_id: &str, row_ids: &[String]) -> Result<WriteOutcome, String> {
        let mut state = self.state.lock().expect("poisoned mutex");
        state.calls.push(StoreCall::Delete {
            table_id: table_id.to_string(),
            row_ids: row_ids.to_vec(),
        });
        state.table(table_id)?;

        let mut outcome = WriteOutcome::default();
        for row_id in row_ids {
            if let Some(failure) = state.rejection(row_id) {
                outcome.failed.push(failure);
                continue;
            }
            let table = state.table_mut(table_id)?;
            table.rows.retain(|row| &row.row_id != row_id);
        }
        Ok(outcome)
    }

    fn batch_upsert_rows(&self, table_id: &str, rows: &[RowUpsert]) -> Result<UpsertOutcome, String> {
        let mut state = self.state.lock().expect("poisoned mutex");
        state.calls.push(StoreCall::Upsert {
            table_id: table_id.to_string(),
            batch_item_ids: rows.iter().map(|row| row.batch_item_id.clone()).collect(),
        });
        state.table(table_id)?;

        let mut outcome = UpsertOutcome::default();
        for upsert in rows {
            if let Some(failure) = state.rejection(&upsert.batch_item_id) {
                outcome.failed.push(failure);
                continue;
            }
            let filter = ParsedFilter::parse(&upsert.formula)?;
            let new_row_id = state.allocate_row_id();
            let table = state.table_mut(table_id)?;
            let matching: Vec<usize> = table
                .rows
                .iter()
                .enumerate()
                .filter(|(_, row)| filter.matches(table, row))
                .map(|(index, _)| index)
                .collect();

            if matching.is_empty() {
                let mut cells = Vec::new();
                table.apply_cells(&mut cells, &upsert.cells);
                table.rows.push(WorkbookRow {
                    row_id: new_row_id,
                    cells,
                });
                outcome
                    .rows
                    .push((upsert.batch_item_id.clone(), UpsertAction::Appended));
            } else {
                for index in matching {
                    let mut cells = table.rows[index].cells.clone();
                    table.apply_cells(&mut cells, &upsert.cells);
                    table.rows[index].cells = cells;
                }
                outcome
                    .rows
                    .push((upsert.batch_item_id.clone(), UpsertAction::Updated));
            }
        }
        Ok(outcome)
    }

    fn start_import_job(&self, request: &ImportJobRequest) -> Result<ImportJobStarted, String> {
        let mut state = self.state.lock().expect("poisoned mutex");
        state.table(&request.destination_table_id)?;
        state.calls.push(StoreCall::ImportJob {
            table_id: request.destination_table_id.clone(),
            client_request_token: request.client_request_token.clone(),
        });
        state.import_jobs.push(request.clone());
        Ok(ImportJobStarted {
            job_id: format!("job-{}", state.import_jobs.len()),
            job_status: "SUBMITTED".to_string(),
        })
    }
}

/// `=FILTER(Table)` or `=FILTER(Table, "Table[Col] = % OR ...", "v1", ...)`.
#[derive(Debug)]
struct ParsedFilter {
    /// Column name and expected value per OR clause; `None` keeps every row.
    clauses: Option<Vec<(String, String)>>,
}

impl ParsedFilter {
    fn parse(formula: &str) -> Result<Self, String> {
        let inner = formula
            .strip_prefix("=FILTER(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| format!("unsupported formula {formula}"))?;

        let Some((_, arguments)) = inner.split_once(", ") else {
            return Ok(Self { clauses: None });
        };
        let mut strings = parse_quoted_list(arguments)?.into_iter();
        let condition = strings
            .next()
            .ok_or_else(|| format!("formula without condition {formula}"))?;
        let mut clauses = Vec::new();
        for clause in condition.split(" OR ") {
            let column = clause
                .split_once('[')
                .and_then(|(_, rest)| rest.split_once(']'))
                .map(|(column, _)| column.to_string())
                .ok_or_else(|| format!("unsupported clause {clause}"))?;
            let value = strings
                .next()
                .ok_or_else(|| format!("missing argument for clause {clause}"))?;
            clauses.push((column, value));
        }
        Ok(Self {
            clauses: Some(clauses),
        })
    }

    fn matches(&self, table: &FakeTable, row: &WorkbookRow) -> bool {
        let Some(clauses) = &self.clauses else {
            return true;
        };
        clauses.iter().any(|(column, value)| {
            table
                .column_index_by_name(column)
                .and_then(|index| row.cell(index))
                .map(|cell| cell == value)
                .unwrap_or(false)
        })
    }
}

fn parse_quoted_list(input: &str) -> Result<Vec<String>, String> {
    let mut values = Vec::new();
    let mut chars = input.chars().peekable();
    loop {
        while chars.peek() == Some(&' ') || chars.peek() == Some(&',') {
            chars.next();
        }
        match chars.next() {
            None => return Ok(values),
            Some('"') => {}
            Some(other) => return Err(format!("expected quoted argument, found '{other}'")),
        }
        let mut value = String::new();
        loop {
            match chars.next() {
                None => return Err("unterminated quoted argument".to_string()),
                Some('"') if chars.peek() == Some(&'"') => {
                    chars.next();
                    value.push('"');
                }
                Some('"') => break,
                Some(other) => value.push(other),
            }
        }
        values.push(value);
    }
}

#[derive(Default)]
pub struct RecordingObjectStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    fail_writes: Mutex<bool>,
}

impl RecordingObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_object(&self, bucket: &str, key: &str, body: &[u8]) {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .insert((bucket.to_string(), key.to_string()), body.to_vec());
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .keys()
            .filter(|(object_bucket, _)| object_bucket == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub fn body(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn fail_writes(&self) {
        *self.fail_writes.lock().expect("poisoned mutex") = true;
    }
}

impl ObjectStore for RecordingObjectStore {
    fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        self.body(bucket, key)
            .ok_or_else(|| format!("no object at s3://{bucket}/{key}"))
    }

    fn write_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String> {
        if *self.fail_writes.lock().expect("poisoned mutex") {
            return Err(format!("simulated write failure for key: {key}"));
        }
        self.seed_object(bucket, key, body);
        Ok(())
    }

    fn presigned_read_url(&self, bucket: &str, key: &str) -> Result<String, String> {
        Ok(format!(
            "https://{bucket}.s3.amazonaws.com/{key}?X-Amz-Expires=900"
        ))
    }
}
