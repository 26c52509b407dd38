//! Starts a workbook import job for every uploaded customers file.

use serde::Serialize;
use serde_json::json;
use workbook_sync_core::contract::S3Event;
use workbook_sync_core::import_job::{decode_object_key, import_client_token};
use workbook_sync_core::report::MISSING_RECORDS_MESSAGE;
use workbook_sync_core::workbook::{DelimitedImportOptions, ImportJobRequest};

use crate::adapters::object_store::ObjectStore;
use crate::adapters::workbook_store::WorkbookStore;
use crate::config::ImportJobConfig;
use crate::error::SyncError;
use crate::handlers::resolver::load_catalog;
use crate::logging::{log_error, log_info};

const COMPONENT: &str = "import_job";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportJobOutcome {
    pub message: String,
    pub job_ids: Vec<String>,
}

pub fn handle_import_event(
    event: S3Event,
    config: &ImportJobConfig,
    store: &dyn WorkbookStore,
    objects: &dyn ObjectStore,
) -> Result<ImportJobOutcome, SyncError> {
    let Some(records) = event.records else {
        log_error(
            COMPONENT,
            "missing_records",
            json!({ "message": MISSING_RECORDS_MESSAGE }),
        );
        return Ok(ImportJobOutcome {
            message: MISSING_RECORDS_MESSAGE.to_string(),
            job_ids: Vec::new(),
        });
    };
    log_info(COMPONENT, "records_received", json!({ "records": records.len() }));

    let catalog = load_catalog(store)?;
    let table_id = catalog.table_id(&config.customers_table)?.to_string();

    let mut job_ids = Vec::with_capacity(records.len());
    for record in &records {
        let bucket = &record.s3.bucket.name;
        let key = decode_object_key(&record.s3.object.key)?;
        let request = ImportJobRequest {
            destination_table_id: table_id.clone(),
            data_source_url: objects.presigned_read_url(bucket, &key)?,
            client_request_token: import_client_token(bucket, &key),
            options: DelimitedImportOptions::default(),
        };
        let started = store.start_import_job(&request)?;
        log_info(
            COMPONENT,
            "import_job_started",
            json!({
                "bucket": bucket,
                "key": key,
                "job_id": started.job_id,
                "job_status": started.job_status,
            }),
        );
        job_ids.push(started.job_id);
    }

    Ok(ImportJobOutcome {
        message: format!("Started {} import job(s)", job_ids.len()),
        job_ids,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::config::WorkbookAccess;
    use crate::testing::{InMemoryWorkbookStore, RecordingObjectStore};

    use super::*;

    fn config() -> ImportJobConfig {
        ImportJobConfig {
            access: WorkbookAccess {
                workbook_id: "wb-1".to_string(),
                region: "us-west-2".to_string(),
                cross_account_role_arn: None,
            },
            customers_table: "Customers".to_string(),
        }
    }

    fn s3_event(keys: &[&str]) -> S3Event {
        let records: Vec<_> = keys
            .iter()
            .map(|key| {
                json!({
                    "eventSource": "aws:s3",
                    "s3": { "bucket": { "name": "uploads" }, "object": { "key": key } }
                })
            })
            .collect();
        serde_json::from_value(json!({ "Records": records })).expect("event should parse")
    }

    #[test]
    fn starts_one_job_per_object() {
        let store = InMemoryWorkbookStore::new();
        let table_id = store.add_table("Customers", &["Company"]);
        let objects = RecordingObjectStore::new();

        let outcome = handle_import_event(
            s3_event(&["new+customers.csv", "more.csv"]),
            &config(),
            &store,
            &objects,
        )
        .expect("jobs should start");

        assert_eq!(outcome.job_ids, vec!["job-1", "job-2"]);
        let jobs = store.import_jobs();
        assert_eq!(jobs[0].destination_table_id, table_id);
        assert_eq!(
            jobs[0].data_source_url,
            "https://uploads.s3.amazonaws.com/new customers.csv?X-Amz-Expires=900"
        );
        assert_eq!(jobs[0].client_request_token, "s3://uploads/new customers.csv--");
        assert_eq!(jobs[1].options, DelimitedImportOptions::default());
    }

    #[test]
    fn missing_records_returns_message() {
        let store = InMemoryWorkbookStore::new();
        let objects = RecordingObjectStore::new();

        let outcome = handle_import_event(S3Event::default(), &config(), &store, &objects)
            .expect("should not fail");

        assert_eq!(outcome.message, "Lambda was invoked without any event Records");
        assert!(store.import_jobs().is_empty());
    }
}
