#![allow(dead_code)]

use serde_json::{json, Value};
use workbook_sync_core::contract::StreamEvent;
use workbook_sync_lambda::config::{
    ContactHistoryLink, CustomerTables, ExportConfig, StreamImportConfig, WorkbookAccess,
};
use workbook_sync_lambda::testing::InMemoryWorkbookStore;

pub const CUSTOMERS: &str = "Customers";
pub const CONTACT_HISTORY: &str = "Contact History";

pub fn access() -> WorkbookAccess {
    WorkbookAccess {
        workbook_id: "workbook-1".to_string(),
        region: "us-west-2".to_string(),
        cross_account_role_arn: None,
    }
}

pub fn stream_config() -> StreamImportConfig {
    StreamImportConfig {
        access: access(),
        customers: CustomerTables {
            customers_table: CUSTOMERS.to_string(),
            country_table: "Country".to_string(),
            status_table: "Status".to_string(),
            key_column: "Company".to_string(),
        },
        contact_history: Some(ContactHistoryLink {
            table: CONTACT_HISTORY.to_string(),
            customer_column: "Customer".to_string(),
        }),
    }
}

pub fn export_config(page_size: usize) -> ExportConfig {
    ExportConfig {
        access: access(),
        table: CONTACT_HISTORY.to_string(),
        exported_column: "Exported".to_string(),
        bucket: "contact-exports".to_string(),
        prefix: "history".to_string(),
        page_size,
    }
}

/// Customers, reference tables and contact history with a few seeded rows.
pub fn seeded_workbook() -> InMemoryWorkbookStore {
    let store = InMemoryWorkbookStore::new();
    store.add_table(CUSTOMERS, &["Company", "Contact", "Country", "Status"]);
    store.add_table("Country", &["Name"]);
    store.add_table("Status", &["Name"]);
    store.add_table(CONTACT_HISTORY, &["Customer", "Notes", "Exported"]);
    store.insert_row("Country", &["US"]);
    store.insert_row("Country", &["CA"]);
    store.insert_row("Status", &["Active"]);
    store.insert_row("Status", &["Churned"]);
    store
}

pub fn image(company: &str, contact: &str, country: &str, status: &str) -> Value {
    json!({
        "Company": { "S": company },
        "Contact": { "S": contact },
        "Country": { "S": country },
        "Status": { "S": status },
    })
}

pub fn insert(company: &str, country: &str, status: &str) -> Value {
    json!({
        "eventName": "INSERT",
        "eventSource": "aws:dynamodb",
        "dynamodb": {
            "Keys": { "Company": { "S": company } },
            "NewImage": image(company, "Jane", country, status),
        }
    })
}

pub fn modify(company: &str, country: &str, status: &str) -> Value {
    json!({
        "eventName": "MODIFY",
        "eventSource": "aws:dynamodb",
        "dynamodb": {
            "Keys": { "Company": { "S": company } },
            "NewImage": image(company, "Jane", country, status),
        }
    })
}

pub fn remove(company: &str) -> Value {
    json!({
        "eventName": "REMOVE",
        "eventSource": "aws:dynamodb",
        "dynamodb": { "Keys": { "Company": { "S": company } } }
    })
}

pub fn stream_event(records: Vec<Value>) -> StreamEvent {
    serde_json::from_value(json!({ "Records": records })).expect("stream event should parse")
}
