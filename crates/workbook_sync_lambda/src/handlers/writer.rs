//! Applies batcher flushes to the customers table.
//!
//! Creates carry their batch position as the batch item id. Updates and
//! deletes first re-resolve natural keys to row ids with one disjunctive
//! filter. Item failures are logged and reported, never retried.

use std::collections::BTreeMap;

use serde_json::json;
use workbook_sync_core::batcher::{Batch, BatchItem, BatchKind, Flush};
use workbook_sync_core::formula::Predicate;
use workbook_sync_core::lookup::LookupSet;
use workbook_sync_core::report::{BatchReport, FailedBatchItem};
use workbook_sync_core::workbook::{CellValues, RowCreate, RowUpdate, StoreFailure, WorkbookRow};

use crate::adapters::workbook_store::{WorkbookStore, MAX_BATCH_ROWS};
use crate::error::SyncError;
use crate::handlers::resolver::{query_all_rows, ResolvedTable};
use crate::logging::{log_error, log_info};

const COMPONENT: &str = "batch_writer";

/// Rows in another table that must go away with their customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeTarget {
    pub table: ResolvedTable,
    pub customer_column: String,
}

pub struct BatchWriter<'a> {
    store: &'a dyn WorkbookStore,
    customers: &'a ResolvedTable,
    key_column: &'a str,
    lookups: &'a LookupSet,
    cascade: Option<&'a CascadeTarget>,
}

impl<'a> BatchWriter<'a> {
    pub fn new(
        store: &'a dyn WorkbookStore,
        customers: &'a ResolvedTable,
        key_column: &'a str,
        lookups: &'a LookupSet,
    ) -> Self {
        Self {
            store,
            customers,
            key_column,
            lookups,
            cascade: None,
        }
    }

    pub fn with_cascade(mut self, cascade: &'a CascadeTarget) -> Self {
        self.cascade = Some(cascade);
        self
    }

    /// Writes every batch of `flush` in its apply order. Each report is
    /// logged and pushed onto `reports` as soon as its batch is written, so
    /// a later failing batch does not hide item failures of earlier ones.
    pub fn write_flush(
        &self,
        flush: &Flush,
        reports: &mut Vec<BatchReport>,
    ) -> Result<(), SyncError> {
        for batch in &flush.batches {
            match batch.kind {
                BatchKind::Delete => self.write_deletes(batch, reports)?,
                BatchKind::Create => record(reports, self.write_creates(batch)?),
                BatchKind::Update => record(reports, self.write_updates(batch)?),
            }
        }
        Ok(())
    }

    fn resolve_cells(&self, item: &BatchItem) -> CellValues {
        let substituted = self.lookups.apply(&item.fields);
        let resolved = self.customers.schema.resolve_cells(&substituted);
        if !resolved.unmapped.is_empty() {
            log_info(
                COMPONENT,
                "unmapped_fields",
                json!({
                    "table": self.customers.name(),
                    "position": item.position,
                    "fields": resolved.unmapped,
                }),
            );
        }
        resolved.cells
    }

    pub fn write_creates(&self, batch: &Batch) -> Result<BatchReport, SyncError> {
        let mut report = BatchReport::new(BatchKind::Create, self.customers.name());
        for chunk in batch.items.chunks(MAX_BATCH_ROWS) {
            let rows: Vec<RowCreate> = chunk
                .iter()
                .map(|item| RowCreate {
                    batch_item_id: item.batch_item_id(),
                    cells: self.resolve_cells(item),
                })
                .collect();
            let outcome = self.store.batch_create_rows(&self.customers.id, &rows)?;
            report.attempted += rows.len();
            report
                .failed
                .extend(outcome.failed.into_iter().map(|failure| FailedBatchItem {
                    position: failure.id.parse().ok(),
                    id: failure.id,
                    message: failure.message,
                }));
        }
        Ok(report)
    }

    pub fn write_updates(&self, batch: &Batch) -> Result<BatchReport, SyncError> {
        let mut report = BatchReport::new(BatchKind::Update, self.customers.name());
        let key_index = self.customers.schema.require_column_index(self.key_column)?;
        let rows = self.find_rows(self.customers, self.key_column, &batch.natural_keys())?;
        let row_ids = rows_by_cell(&rows, key_index);

        // Items sharing a key collapse into one row update; later cells win.
        let mut updates: Vec<RowUpdate> = Vec::with_capacity(batch.len());
        let mut slots: BTreeMap<&str, usize> = BTreeMap::new();
        let mut positions: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for item in &batch.items {
            let Some(row_id) = row_ids.get(item.natural_key.as_str()).copied() else {
                report.attempted += 1;
                report.failed.push(FailedBatchItem {
                    position: Some(item.position),
                    id: item.batch_item_id(),
                    message: format!(
                        "No row in '{}' has {} '{}'",
                        self.customers.name(),
                        self.key_column,
                        item.natural_key
                    ),
                });
                continue;
            };
            let cells = self.resolve_cells(item);
            match slots.get(row_id) {
                Some(&slot) => updates[slot].cells.extend(cells),
                None => {
                    slots.insert(row_id, updates.len());
                    updates.push(RowUpdate {
                        row_id: row_id.to_string(),
                        cells,
                    });
                }
            }
            positions
                .entry(row_id.to_string())
                .or_default()
                .push(item.position);
        }

        for chunk in updates.chunks(MAX_BATCH_ROWS) {
            let outcome = self.store.batch_update_rows(&self.customers.id, chunk)?;
            report.attempted += chunk
                .iter()
                .map(|update| positions.get(&update.row_id).map_or(1, Vec::len))
                .sum::<usize>();
            report
                .failed
                .extend(positioned_failures(outcome.failed, &positions));
        }
        report.failed.sort_by_key(|failure| failure.position);
        Ok(report)
    }

    /// Deletes matching contact-history rows first (when configured), then
    /// the customer rows. Pushes one report per table touched.
    pub fn write_deletes(
        &self,
        batch: &Batch,
        reports: &mut Vec<BatchReport>,
    ) -> Result<(), SyncError> {
        let keys = batch.natural_keys();

        if let Some(cascade) = self.cascade {
            let customer_index = cascade
                .table
                .schema
                .require_column_index(&cascade.customer_column)?;
            let rows = self.find_rows(&cascade.table, &cascade.customer_column, &keys)?;
            record(
                reports,
                self.delete_rows(batch, &cascade.table, &rows, customer_index)?,
            );
        }

        let key_index = self.customers.schema.require_column_index(self.key_column)?;
        let rows = self.find_rows(self.customers, self.key_column, &keys)?;
        record(
            reports,
            self.delete_rows(batch, self.customers, &rows, key_index)?,
        );
        Ok(())
    }

    fn delete_rows(
        &self,
        batch: &Batch,
        table: &ResolvedTable,
        rows: &[WorkbookRow],
        key_index: usize,
    ) -> Result<BatchReport, SyncError> {
        let mut report = BatchReport::new(BatchKind::Delete, table.name());
        let positions: BTreeMap<String, Vec<usize>> = rows
            .iter()
            .filter_map(|row| {
                let item = batch.item_for_key(row.cell(key_index)?)?;
                Some((row.row_id.clone(), vec![item.position]))
            })
            .collect();
        let row_ids: Vec<String> = rows.iter().map(|row| row.row_id.clone()).collect();

        for chunk in row_ids.chunks(MAX_BATCH_ROWS) {
            let outcome = self.store.batch_delete_rows(&table.id, chunk)?;
            report.attempted += chunk.len();
            report
                .failed
                .extend(positioned_failures(outcome.failed, &positions));
        }
        Ok(report)
    }

    /// Rows of `table` whose `column` equals any of `values`, queried in
    /// chunks so a single filter never names more than one request's worth.
    fn find_rows(
        &self,
        table: &ResolvedTable,
        column: &str,
        values: &[&str],
    ) -> Result<Vec<WorkbookRow>, SyncError> {
        let mut rows = Vec::new();
        for chunk in values.chunks(MAX_BATCH_ROWS) {
            let Some(predicate) = Predicate::any_of(column, chunk.iter().copied()) else {
                continue;
            };
            rows.extend(query_all_rows(self.store, table, &predicate)?);
        }
        Ok(rows)
    }
}

/// Cell value at `index` to row id. Later rows win on duplicate values.
fn rows_by_cell(rows: &[WorkbookRow], index: usize) -> BTreeMap<&str, &str> {
    rows.iter()
        .filter_map(|row| Some((row.cell(index)?, row.row_id.as_str())))
        .collect()
}

/// One failed item per input position sent for the failed row. A row sent
/// for two updates in the same run fails both of them.
fn positioned_failures(
    failures: Vec<StoreFailure>,
    positions: &BTreeMap<String, Vec<usize>>,
) -> impl Iterator<Item = FailedBatchItem> + '_ {
    failures.into_iter().flat_map(move |failure| {
        let sent: Vec<Option<usize>> = match positions.get(&failure.id) {
            Some(found) if !found.is_empty() => found.iter().copied().map(Some).collect(),
            _ => vec![None],
        };
        sent.into_iter().map(move |position| FailedBatchItem {
            position,
            id: failure.id.clone(),
            message: failure.message.clone(),
        })
    })
}

fn record(reports: &mut Vec<BatchReport>, report: BatchReport) {
    log_report(&report);
    reports.push(report);
}

fn log_report(report: &BatchReport) {
    let details = json!({
        "kind": report.kind.as_str(),
        "table": report.table,
        "attempted": report.attempted,
        "succeeded": report.succeeded(),
        "failed": report.failed,
    });
    if report.has_failures() {
        log_error(COMPONENT, "batch_items_failed", details);
    } else {
        log_info(COMPONENT, "batch_written", details);
    }
}
