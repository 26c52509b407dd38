//! Contact-history export to S3.
//!
//! Each page of unexported rows becomes one CSV object, after which the page's
//! rows are stamped with the export date. A crash between the two leaves the
//! page unmarked, so it is exported again on the next run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use workbook_sync_core::export::{
    export_date, export_object_key, export_summary, render_csv, stamp_rows,
};
use workbook_sync_core::formula::{filter_formula, Predicate};
use workbook_sync_core::report::FailedBatchItem;
use workbook_sync_core::workbook::{RowQuery, RowUpdate};

use crate::adapters::object_store::ObjectStore;
use crate::adapters::workbook_store::{WorkbookStore, MAX_BATCH_ROWS};
use crate::config::ExportConfig;
use crate::error::SyncError;
use crate::handlers::resolver::{load_catalog, load_table};
use crate::logging::{log_error, log_info};

const COMPONENT: &str = "contact_history_export";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExportOutcome {
    pub message: String,
    pub rows_exported: usize,
    pub object_keys: Vec<String>,
    pub failed: Vec<FailedBatchItem>,
}

pub fn handle_export(
    config: &ExportConfig,
    run_time: DateTime<Utc>,
    store: &dyn WorkbookStore,
    objects: &dyn ObjectStore,
) -> Result<ExportOutcome, SyncError> {
    let catalog = load_catalog(store)?;
    let table = load_table(store, &catalog, &config.table)?;
    table.schema.require_column_index(&config.exported_column)?;
    let stamp_column = table.schema.last_column()?.id.clone();
    let header = table.schema.column_names();
    let date = export_date(run_time);

    let mut query = RowQuery {
        table_id: table.id.clone(),
        formula: filter_formula(table.name(), &Predicate::is_blank(&config.exported_column)),
        max_results: Some(config.page_size),
        next_token: None,
    };
    let mut rows_exported = 0;
    let mut object_keys = Vec::new();
    let mut failed = Vec::new();

    loop {
        let page = store.query_rows(&query)?;
        if !page.rows.is_empty() {
            let body = render_csv(&header, &stamp_rows(&page.rows, &date))?;
            let key = export_object_key(&config.prefix, run_time, object_keys.len());
            objects.write_object(&config.bucket, &key, &body)?;
            log_info(
                COMPONENT,
                "page_written",
                json!({ "bucket": config.bucket, "key": key, "rows": page.rows.len() }),
            );

            let updates: Vec<RowUpdate> = page
                .rows
                .iter()
                .map(|row| RowUpdate {
                    row_id: row.row_id.clone(),
                    cells: BTreeMap::from([(stamp_column.clone(), date.clone())]),
                })
                .collect();
            for chunk in updates.chunks(MAX_BATCH_ROWS) {
                let outcome = store.batch_update_rows(&table.id, chunk)?;
                if !outcome.failed.is_empty() {
                    log_error(
                        COMPONENT,
                        "mark_exported_failed",
                        json!({ "key": key, "failed": outcome.failed }),
                    );
                }
                failed.extend(outcome.failed.into_iter().map(|failure| FailedBatchItem {
                    position: None,
                    id: failure.id,
                    message: failure.message,
                }));
            }

            rows_exported += page.rows.len();
            object_keys.push(key);
        }

        match page.next_token {
            Some(token) => query.next_token = Some(token),
            None => break,
        }
    }

    let message = export_summary(rows_exported);
    log_info(
        COMPONENT,
        "export_finished",
        json!({ "summary": message, "objects": object_keys.len(), "failed": failed.len() }),
    );
    Ok(ExportOutcome {
        message,
        rows_exported,
        object_keys,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::config::WorkbookAccess;
    use crate::testing::{InMemoryWorkbookStore, RecordingObjectStore};

    use super::*;

    fn config(page_size: usize) -> ExportConfig {
        ExportConfig {
            access: WorkbookAccess {
                workbook_id: "wb-1".to_string(),
                region: "us-west-2".to_string(),
                cross_account_role_arn: None,
            },
            table: "Contact History".to_string(),
            exported_column: "Exported".to_string(),
            bucket: "exports".to_string(),
            prefix: "contact-history".to_string(),
            page_size,
        }
    }

    fn run_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 0)
            .single()
            .expect("valid timestamp")
    }

    fn workbook() -> InMemoryWorkbookStore {
        let store = InMemoryWorkbookStore::new();
        store.add_table("Contact History", &["Customer", "Notes", "Exported"]);
        store
    }

    #[test]
    fn nothing_to_export() {
        let store = workbook();
        store.insert_row("Contact History", &["Acme", "Called", "1/2/2026"]);
        let objects = RecordingObjectStore::new();

        let outcome =
            handle_export(&config(10), run_time(), &store, &objects).expect("export should run");

        assert_eq!(outcome.message, "No contact history records to export");
        assert!(objects.keys("exports").is_empty());
        assert!(store.write_calls().is_empty());
    }

    #[test]
    fn exports_unexported_rows_and_marks_them() {
        let store = workbook();
        let acme = store.insert_row("Contact History", &["Acme", "Called", ""]);
        store.insert_row("Contact History", &["Globex", "Emailed", "1/2/2026"]);
        let objects = RecordingObjectStore::new();

        let outcome =
            handle_export(&config(10), run_time(), &store, &objects).expect("export should run");

        assert_eq!(outcome.message, "Exported 1 row(s) of contact history");
        let key = &outcome.object_keys[0];
        assert!(key.starts_with("contact-history/2026/03/07/"));
        let body = objects.body("exports", key).expect("object written");
        assert_eq!(
            String::from_utf8(body).expect("utf-8"),
            "Customer,Notes,Exported\nAcme,Called,3/7/2026\n"
        );
        let values = store
            .row_values("Contact History", &acme)
            .expect("row exists");
        assert_eq!(values["Exported"], "3/7/2026");
    }

    #[test]
    fn mark_failures_are_reported_and_loop_continues() {
        let store = workbook();
        let acme = store.insert_row("Contact History", &["Acme", "Called", ""]);
        store.insert_row("Contact History", &["Globex", "Emailed", ""]);
        store.insert_row("Contact History", &["Initech", "Visited", ""]);
        store.reject_item(&acme);
        let objects = RecordingObjectStore::new();

        let outcome =
            handle_export(&config(2), run_time(), &store, &objects).expect("export should run");

        assert_eq!(outcome.rows_exported, 3);
        assert_eq!(outcome.object_keys.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].id, acme);
    }

    #[test]
    fn object_write_failure_aborts_before_marking() {
        let store = workbook();
        let acme = store.insert_row("Contact History", &["Acme", "Called", ""]);
        let objects = RecordingObjectStore::new();
        objects.fail_writes();

        let error =
            handle_export(&config(10), run_time(), &store, &objects).expect_err("should fail");

        assert!(error.message.starts_with("simulated write failure"));
        let values = store
            .row_values("Contact History", &acme)
            .expect("row exists");
        assert_eq!(values["Exported"], "");
    }

    #[test]
    fn missing_exported_column_is_rejected() {
        let store = InMemoryWorkbookStore::new();
        store.add_table("Contact History", &["Customer", "Notes"]);
        let objects = RecordingObjectStore::new();

        let error =
            handle_export(&config(10), run_time(), &store, &objects).expect_err("should fail");

        assert_eq!(
            error.message,
            "Table 'Contact History' has no column named 'Exported'"
        );
    }
}
