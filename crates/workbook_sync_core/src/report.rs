use serde::Serialize;

use crate::batcher::BatchKind;
use crate::workbook::UpsertAction;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedBatchItem {
    /// 1-based input position of the record, when the failure can be traced
    /// back to one.
    pub position: Option<usize>,
    pub id: String,
    pub message: String,
}

/// Outcome of writing one batch to one table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BatchReport {
    pub kind: BatchKind,
    pub table: String,
    pub attempted: usize,
    pub failed: Vec<FailedBatchItem>,
}

impl BatchReport {
    pub fn new(kind: BatchKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            attempted: 0,
            failed: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.attempted.saturating_sub(self.failed.len())
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertTally {
    pub updated: usize,
    pub appended: usize,
}

impl UpsertTally {
    pub fn record(&mut self, action: UpsertAction) {
        match action {
            UpsertAction::Updated => self.updated += 1,
            UpsertAction::Appended => self.appended += 1,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Update customers results: {{\"UPDATED\":{},\"APPENDED\":{}}}",
            self.updated, self.appended
        )
    }
}

pub fn stream_import_summary(records_processed: usize) -> String {
    format!("Processed {records_processed} records from DynamoDB")
}

pub const MISSING_RECORDS_MESSAGE: &str = "Lambda was invoked without any event Records";
