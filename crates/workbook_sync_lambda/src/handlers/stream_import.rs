//! DynamoDB stream to customers table.

use serde::Serialize;
use serde_json::json;
use workbook_sync_core::batcher::ChangeBatcher;
use workbook_sync_core::contract::{decode_change_records, StreamEvent};
use workbook_sync_core::report::{stream_import_summary, BatchReport, MISSING_RECORDS_MESSAGE};

use crate::adapters::workbook_store::WorkbookStore;
use crate::config::StreamImportConfig;
use crate::error::SyncError;
use crate::handlers::resolver::{load_catalog, load_lookups, load_table};
use crate::handlers::writer::{BatchWriter, CascadeTarget};
use crate::logging::{log_error, log_info};

const COMPONENT: &str = "stream_import";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StreamImportOutcome {
    pub message: String,
    pub records_processed: usize,
    pub flush_count: usize,
    pub reports: Vec<BatchReport>,
}

pub fn handle_stream_event(
    event: StreamEvent,
    config: &StreamImportConfig,
    store: &dyn WorkbookStore,
) -> Result<StreamImportOutcome, SyncError> {
    let Some(records) = event.records else {
        log_error(
            COMPONENT,
            "missing_records",
            json!({ "message": MISSING_RECORDS_MESSAGE }),
        );
        return Ok(StreamImportOutcome {
            message: MISSING_RECORDS_MESSAGE.to_string(),
            records_processed: 0,
            flush_count: 0,
            reports: Vec::new(),
        });
    };

    let changes = decode_change_records(&records, &config.customers.key_column)?;
    if changes.is_empty() {
        return Ok(StreamImportOutcome {
            message: stream_import_summary(0),
            records_processed: 0,
            flush_count: 0,
            reports: Vec::new(),
        });
    }

    let catalog = load_catalog(store)?;
    let customers = load_table(store, &catalog, &config.customers.customers_table)?;
    let lookups = load_lookups(store, &catalog, &config.customers)?;
    let cascade = match &config.contact_history {
        Some(link) => Some(CascadeTarget {
            table: load_table(store, &catalog, &link.table)?,
            customer_column: link.customer_column.clone(),
        }),
        None => None,
    };

    let mut writer = BatchWriter::new(store, &customers, &config.customers.key_column, &lookups);
    if let Some(cascade) = &cascade {
        writer = writer.with_cascade(cascade);
    }

    let mut batcher = ChangeBatcher::new();
    let mut flush_count = 0;
    let mut reports = Vec::new();
    for change in changes {
        if let Some(flush) = batcher.push(change) {
            flush_count += 1;
            writer.write_flush(&flush, &mut reports)?;
        }
    }
    let records_processed = batcher.records_seen();
    if let Some(flush) = batcher.finish() {
        flush_count += 1;
        writer.write_flush(&flush, &mut reports)?;
    }

    let message = stream_import_summary(records_processed);
    log_info(
        COMPONENT,
        "stream_processed",
        json!({
            "records": records_processed,
            "flushes": flush_count,
            "failed_items": reports.iter().map(|report| report.failed.len()).sum::<usize>(),
        }),
    );

    Ok(StreamImportOutcome {
        message,
        records_processed,
        flush_count,
        reports,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use workbook_sync_core::batcher::BatchKind;

    use crate::config::{ContactHistoryLink, CustomerTables, WorkbookAccess};
    use crate::testing::{InMemoryWorkbookStore, StoreCall};

    use super::*;

    fn config() -> StreamImportConfig {
        StreamImportConfig {
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
            contact_history: Some(ContactHistoryLink {
                table: "Contact History".to_string(),
                customer_column: "Customer".to_string(),
            }),
        }
    }

    fn workbook() -> InMemoryWorkbookStore {
        let store = InMemoryWorkbookStore::new();
        store.add_table("Customers", &["Company", "Country", "Status"]);
        store.add_table("Country", &["Name"]);
        store.add_table("Status", &["Name"]);
        store.add_table("Contact History", &["Customer", "Notes", "Exported"]);
        store
    }

    fn event(value: serde_json::Value) -> StreamEvent {
        serde_json::from_value(value).expect("event should deserialize")
    }

    fn change(name: &str, company: &str) -> serde_json::Value {
        json!({
            "eventID": format!("{name}-{company}"),
            "eventName": name,
            "eventSource": "aws:dynamodb",
            "dynamodb": {
                "Keys": { "Company": { "S": company } },
                "NewImage": {
                    "Company": { "S": company },
                    "Country": { "S": "US" },
                    "Status": { "S": "Active" }
                }
            }
        })
    }

    #[test]
    fn missing_records_returns_message_without_calls() {
        let store = workbook();

        let outcome =
            handle_stream_event(event(json!({})), &config(), &store).expect("should not fail");

        assert_eq!(outcome.message, "Lambda was invoked without any event Records");
        assert!(store.calls().is_empty());
    }

    #[test]
    fn empty_records_do_no_writes() {
        let store = workbook();

        let outcome = handle_stream_event(event(json!({ "Records": [] })), &config(), &store)
            .expect("should not fail");

        assert_eq!(outcome.records_processed, 0);
        assert_eq!(outcome.flush_count, 0);
        assert!(store.write_calls().is_empty());
    }

    #[test]
    fn modify_then_remove_flushes_update_before_delete() {
        let store = workbook();
        store.insert_row("Customers", &["Acme", "US", "Active"]);
        store.insert_row("Customers", &["Globex", "US", "Active"]);

        let outcome = handle_stream_event(
            event(json!({ "Records": [
                change("MODIFY", "Acme"),
                change("MODIFY", "Globex"),
                change("REMOVE", "Acme"),
            ]})),
            &config(),
            &store,
        )
        .expect("stream should import");

        assert_eq!(outcome.message, "Processed 3 records from DynamoDB");
        assert_eq!(outcome.flush_count, 2);
        let kinds: Vec<(BatchKind, usize)> = outcome
            .reports
            .iter()
            .filter(|report| report.table == "Customers")
            .map(|report| (report.kind, report.attempted))
            .collect();
        assert_eq!(kinds, vec![(BatchKind::Update, 2), (BatchKind::Delete, 1)]);
        assert!(matches!(
            store.write_calls().last(),
            Some(StoreCall::Delete { .. })
        ));
        assert!(store.find_row("Customers", "Company", "Acme").is_none());
    }

    #[test]
    fn inserts_link_reference_rows() {
        let store = workbook();
        let us = store.insert_row("Country", &["US"]);
        let active = store.insert_row("Status", &["Active"]);

        handle_stream_event(
            event(json!({ "Records": [change("INSERT", "Initech")] })),
            &config(),
            &store,
        )
        .expect("stream should import");

        let row = store
            .find_row("Customers", "Company", "Initech")
            .expect("row inserted");
        assert_eq!(row.cells, vec!["Initech".to_string(), us, active]);
    }

    #[test]
    fn unknown_table_aborts_invocation() {
        let store = InMemoryWorkbookStore::new();

        let error = handle_stream_event(
            event(json!({ "Records": [change("INSERT", "Initech")] })),
            &config(),
            &store,
        )
        .expect_err("should fail");

        assert_eq!(error.message, "Workbook has no table named 'Customers'");
    }
}
