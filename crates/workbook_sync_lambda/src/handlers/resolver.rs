//! Table, schema, and reference-lookup loading shared by the handlers.

use serde_json::json;
use workbook_sync_core::formula::{filter_formula, Predicate};
use workbook_sync_core::lookup::{LookupMap, LookupSet};
use workbook_sync_core::schema::{TableCatalog, TableSchema};
use workbook_sync_core::workbook::{RowQuery, WorkbookRow};

use crate::adapters::workbook_store::WorkbookStore;
use crate::config::CustomerTables;
use crate::error::SyncError;
use crate::logging::log_info;

const COMPONENT: &str = "resolver";

/// A table id together with its column layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTable {
    pub id: String,
    pub schema: TableSchema,
}

impl ResolvedTable {
    pub fn name(&self) -> &str {
        self.schema.table_name()
    }
}

pub fn load_catalog(store: &dyn WorkbookStore) -> Result<TableCatalog, SyncError> {
    let tables = store.list_tables()?;
    Ok(TableCatalog::from_tables(tables))
}

pub fn load_table(
    store: &dyn WorkbookStore,
    catalog: &TableCatalog,
    name: &str,
) -> Result<ResolvedTable, SyncError> {
    let id = catalog.table_id(name)?.to_string();
    let columns = store.list_columns(&id)?;
    Ok(ResolvedTable {
        id,
        schema: TableSchema::new(name, columns),
    })
}

/// Runs `predicate` against `table`, following continuation tokens until the
/// result set is exhausted.
pub fn query_all_rows(
    store: &dyn WorkbookStore,
    table: &ResolvedTable,
    predicate: &Predicate,
) -> Result<Vec<WorkbookRow>, SyncError> {
    let mut query = RowQuery {
        table_id: table.id.clone(),
        formula: filter_formula(table.name(), predicate),
        max_results: None,
        next_token: None,
    };
    let mut rows = Vec::new();
    loop {
        let page = store.query_rows(&query)?;
        rows.extend(page.rows);
        match page.next_token {
            Some(token) => query.next_token = Some(token),
            None => return Ok(rows),
        }
    }
}

/// First-column value to row id for every row of a reference table.
pub fn load_lookup(store: &dyn WorkbookStore, table: &ResolvedTable) -> Result<LookupMap, SyncError> {
    let rows = query_all_rows(store, table, &Predicate::All)?;
    Ok(LookupMap::from_rows(&rows))
}

pub fn load_lookups(
    store: &dyn WorkbookStore,
    catalog: &TableCatalog,
    customers: &CustomerTables,
) -> Result<LookupSet, SyncError> {
    let mut lookups = LookupSet::new();
    for (field, table_name) in customers.lookup_tables() {
        let table = load_table(store, catalog, table_name)?;
        let lookup = load_lookup(store, &table)?;
        log_info(
            COMPONENT,
            "lookup_loaded",
            json!({ "field": field, "table": table_name, "entries": lookup.len() }),
        );
        lookups.insert(field, lookup);
    }
    Ok(lookups)
}
