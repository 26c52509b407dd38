//! Scheduled customer import from a CSV object.

use serde::Serialize;
use serde_json::json;
use workbook_sync_core::customers_csv::parse_customers;
use workbook_sync_core::formula::{filter_formula, Predicate};
use workbook_sync_core::report::{FailedBatchItem, UpsertTally};
use workbook_sync_core::workbook::RowUpsert;

use crate::adapters::object_store::ObjectStore;
use crate::adapters::workbook_store::{WorkbookStore, MAX_BATCH_ROWS};
use crate::config::CsvImportConfig;
use crate::error::SyncError;
use crate::handlers::resolver::{load_catalog, load_lookups, load_table};
use crate::logging::{log_error, log_info};

const COMPONENT: &str = "csv_import";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CsvImportOutcome {
    pub message: String,
    pub updated: usize,
    pub appended: usize,
    pub failed: Vec<FailedBatchItem>,
}

pub fn handle_csv_import(
    config: &CsvImportConfig,
    store: &dyn WorkbookStore,
    objects: &dyn ObjectStore,
) -> Result<CsvImportOutcome, SyncError> {
    let body = objects.read_object(&config.bucket, &config.key)?;
    let records = parse_customers(&body, &config.customers.key_column)?;
    log_info(
        COMPONENT,
        "customers_read",
        json!({ "bucket": config.bucket, "key": config.key, "records": records.len() }),
    );

    let catalog = load_catalog(store)?;
    let customers = load_table(store, &catalog, &config.customers.customers_table)?;
    let lookups = load_lookups(store, &catalog, &config.customers)?;

    let mut upserts = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let resolved = customers.schema.resolve_cells(&lookups.apply(&record.fields));
        if !resolved.unmapped.is_empty() {
            log_info(
                COMPONENT,
                "unmapped_fields",
                json!({ "row": index, "fields": resolved.unmapped }),
            );
        }
        upserts.push(RowUpsert {
            batch_item_id: format!("row-{index}"),
            formula: filter_formula(
                customers.name(),
                &Predicate::equals(&config.customers.key_column, &record.natural_key),
            ),
            cells: resolved.cells,
        });
    }

    let mut tally = UpsertTally::default();
    let mut failed = Vec::new();
    for chunk in upserts.chunks(MAX_BATCH_ROWS) {
        let outcome = store.batch_upsert_rows(&customers.id, chunk)?;
        for (_, action) in outcome.rows {
            tally.record(action);
        }
        failed.extend(outcome.failed.into_iter().map(|failure| FailedBatchItem {
            position: failure
                .id
                .strip_prefix("row-")
                .and_then(|index| index.parse::<usize>().ok())
                .map(|index| index + 1),
            id: failure.id,
            message: failure.message,
        }));
    }

    let mut message = tally.summary();
    if !failed.is_empty() {
        let items = serde_json::to_string(&failed)
            .map_err(|error| SyncError::new(format!("failed to serialize failures: {error}")))?;
        message.push_str(&format!(" Upsert failed for these items: {items}"));
        log_error(COMPONENT, "upsert_items_failed", json!({ "failed": failed }));
    }
    log_info(COMPONENT, "customers_upserted", json!({ "summary": message }));

    Ok(CsvImportOutcome {
        message,
        updated: tally.updated,
        appended: tally.appended,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use crate::config::{CustomerTables, WorkbookAccess};
    use crate::testing::{InMemoryWorkbookStore, RecordingObjectStore, StoreCall};

    use super::*;

    const CUSTOMERS_CSV: &str =
        "Company,Country,Status\nAcme,US,Active\nGlobex,CA,Prospect\n";

    fn config() -> CsvImportConfig {
        CsvImportConfig {
            access: WorkbookAccess {
                workbook_id: "wb-1".to_string(),
                region: "us-west-2".to_string(),
                cross_account_role_arn: None,
            },
            customers: CustomerTables {
                customers_table: "Customers".to_string(),
                country_table: "Country".to_string(),
                status_table: "Status".to_string(),
                key_column: "Company".to_string(),
            },
            bucket: "imports".to_string(),
            key: "customers.csv".to_string(),
        }
    }

    fn workbook() -> InMemoryWorkbookStore {
        let store = InMemoryWorkbookStore::new();
        store.add_table("Customers", &["Company", "Country", "Status"]);
        store.add_table("Country", &["Name"]);
        store.add_table("Status", &["Name"]);
        store
    }

    #[test]
    fn upserts_each_csv_row_and_counts_actions() {
        let store = workbook();
        let us = store.insert_row("Country", &["US"]);
        let acme = store.insert_row("Customers", &["Acme", "", "Prospect"]);
        let objects = RecordingObjectStore::new();
        objects.seed_object("imports", "customers.csv", CUSTOMERS_CSV.as_bytes());

        let outcome = handle_csv_import(&config(), &store, &objects).expect("import should run");

        assert_eq!(
            outcome.message,
            "Update customers results: {\"UPDATED\":1,\"APPENDED\":1}"
        );
        let values = store.row_values("Customers", &acme).expect("acme kept");
        assert_eq!(values["Country"], us);
        assert_eq!(values["Status"], "Active");
        assert!(store.find_row("Customers", "Company", "Globex").is_some());
        assert!(store.write_calls().iter().any(|call| matches!(
            call,
            StoreCall::Upsert { batch_item_ids, .. } if batch_item_ids == &["row-0", "row-1"]
        )));
    }

    #[test]
    fn failures_are_appended_to_summary() {
        let store = workbook();
        store.reject_item("row-1");
        let objects = RecordingObjectStore::new();
        objects.seed_object("imports", "customers.csv", CUSTOMERS_CSV.as_bytes());

        let outcome = handle_csv_import(&config(), &store, &objects).expect("import should run");

        assert_eq!(outcome.appended, 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].position, Some(2));
        assert!(outcome
            .message
            .contains("Upsert failed for these items: [{\"position\":2,\"id\":\"row-1\""));
    }

    #[test]
    fn missing_object_aborts() {
        let store = workbook();
        let objects = RecordingObjectStore::new();

        let error = handle_csv_import(&config(), &store, &objects).expect_err("should fail");

        assert_eq!(error.message, "no object at s3://imports/customers.csv");
    }
}
