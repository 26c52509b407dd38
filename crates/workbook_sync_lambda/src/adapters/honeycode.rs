//! `WorkbookStore` backed by the AWS workbook (Honeycode) API.

use std::collections::HashMap;
use std::future::Future;

use aws_sdk_honeycode::error::DisplayErrorContext;
use aws_sdk_honeycode::types::{
    CellInput, CreateRowData, DelimitedTextImportOptions, FailedBatchItem, Filter,
    ImportDataCharacterEncoding, ImportDataSource, ImportDataSourceConfig, ImportOptions,
    ImportSourceDataFormat, UpdateRowData, UpsertAction as SdkUpsertAction, UpsertRowData,
};
use workbook_sync_core::workbook::{
    CellValues, ColumnRef, ImportJobRequest, ImportJobStarted, RowCreate, RowPage, RowQuery,
    RowUpdate, RowUpsert, StoreFailure, TableRef, UpsertAction, UpsertOutcome, WorkbookRow,
    WriteOutcome,
};

use crate::adapters::workbook_store::WorkbookStore;
use crate::config::WorkbookAccess;

const ASSUMED_ROLE_SESSION_NAME: &str = "workbook-sync";

pub struct HoneycodeWorkbookStore {
    client: aws_sdk_honeycode::Client,
    workbook_id: String,
}

impl HoneycodeWorkbookStore {
    pub fn new(client: aws_sdk_honeycode::Client, workbook_id: impl Into<String>) -> Self {
        Self {
            client,
            workbook_id: workbook_id.into(),
        }
    }

    /// Builds a client for the configured region, assuming the cross-account
    /// role first when one is configured.
    pub async fn connect(access: &WorkbookAccess) -> Self {
        let region = aws_sdk_honeycode::config::Region::new(access.region.clone());
        let shared_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        let mut builder = aws_sdk_honeycode::config::Builder::from(&shared_config);
        if let Some(role_arn) = &access.cross_account_role_arn {
            let provider = aws_config::sts::AssumeRoleProvider::builder(role_arn.clone())
                .session_name(ASSUMED_ROLE_SESSION_NAME)
                .configure(&shared_config)
                .build()
                .await;
            builder = builder.credentials_provider(provider);
        }

        Self::new(
            aws_sdk_honeycode::Client::from_conf(builder.build()),
            access.workbook_id.clone(),
        )
    }
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

fn cell_inputs(cells: &CellValues) -> HashMap<String, CellInput> {
    cells
        .iter()
        .map(|(column_id, fact)| (column_id.clone(), CellInput::builder().fact(fact).build()))
        .collect()
}

fn filter(formula: &str) -> Result<Filter, String> {
    Filter::builder()
        .formula(formula)
        .build()
        .map_err(|error| format!("invalid filter formula: {error}"))
}

fn failures(items: &[FailedBatchItem]) -> Vec<StoreFailure> {
    items
        .iter()
        .map(|item| StoreFailure {
            id: item.id().to_string(),
            message: item.error_message().to_string(),
        })
        .collect()
}

impl WorkbookStore for HoneycodeWorkbookStore {
    fn list_tables(&self) -> Result<Vec<TableRef>, String> {
        let mut tables = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = block_on(
                self.client
                    .list_tables()
                    .workbook_id(&self.workbook_id)
                    .set_next_token(next_token.take())
                    .send(),
            )
            .map_err(|error| {
                format!("failed to list workbook tables: {}", DisplayErrorContext(&error))
            })?;

            tables.extend(output.tables().iter().filter_map(|table| {
                Some(TableRef {
                    id: table.table_id()?.to_string(),
                    name: table.table_name()?.to_string(),
                })
            }));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(tables)
    }

    fn list_columns(&self, table_id: &str) -> Result<Vec<ColumnRef>, String> {
        let mut columns = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = block_on(
                self.client
                    .list_table_columns()
                    .workbook_id(&self.workbook_id)
                    .table_id(table_id)
                    .set_next_token(next_token.take())
                    .send(),
            )
            .map_err(|error| {
                format!(
                    "failed to list columns of table {table_id}: {}",
                    DisplayErrorContext(&error)
                )
            })?;

            columns.extend(output.table_columns().iter().filter_map(|column| {
                Some(ColumnRef {
                    id: column.table_column_id()?.to_string(),
                    name: column.table_column_name()?.to_string(),
                })
            }));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(columns)
    }

    fn query_rows(&self, query: &RowQuery) -> Result<RowPage, String> {
        let output = block_on(
            self.client
                .query_table_rows()
                .workbook_id(&self.workbook_id)
                .table_id(&query.table_id)
                .filter_formula(filter(&query.formula)?)
                .set_max_results(query.max_results.and_then(|value| i32::try_from(value).ok()))
                .set_next_token(query.next_token.clone())
                .send(),
        )
        .map_err(|error| {
            format!(
                "failed to query rows of table {}: {}",
                query.table_id,
                DisplayErrorContext(&error)
            )
        })?;

        let rows = output
            .rows()
            .iter()
            .map(|row| WorkbookRow {
                row_id: row.row_id().to_string(),
                cells: row
                    .cells()
                    .iter()
                    .map(|cell| cell.formatted_value().unwrap_or_default().to_string())
                    .collect(),
            })
            .collect();

        Ok(RowPage {
            rows,
            next_token: output.next_token().map(str::to_string),
        })
    }

    fn batch_create_rows(&self, table_id: &str, rows: &[RowCreate]) -> Result<WriteOutcome, String> {
        if rows.is_empty() {
            return Ok(WriteOutcome::default());
        }

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = CreateRowData::builder()
                .batch_item_id(&row.batch_item_id)
                .set_cells_to_create(Some(cell_inputs(&row.cells)))
                .build()
                .map_err(|error| format!("invalid create row {}: {error}", row.batch_item_id))?;
            entries.push(entry);
        }

        let output = block_on(
            self.client
                .batch_create_table_rows()
                .workbook_id(&self.workbook_id)
                .table_id(table_id)
                .set_rows_to_create(Some(entries))
                .send(),
        )
        .map_err(|error| {
            format!(
                "failed to create rows in table {table_id}: {}",
                DisplayErrorContext(&error)
            )
        })?;

        Ok(WriteOutcome {
            failed: failures(output.failed_batch_items()),
        })
    }

    fn batch_update_rows(&self, table_id: &str, rows: &[RowUpdate]) -> Result<WriteOutcome, String> {
        if rows.is_empty() {
            return Ok(WriteOutcome::default());
        }

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = UpdateRowData::builder()
                .row_id(&row.row_id)
                .set_cells_to_update(Some(cell_inputs(&row.cells)))
                .build()
                .map_err(|error| format!("invalid update row {}: {error}", row.row_id))?;
            entries.push(entry);
        }

        let output = block_on(
            self.client
                .batch_update_table_rows()
                .workbook_id(&self.workbook_id)
                .table_id(table_id)
                .set_rows_to_update(Some(entries))
                .send(),
        )
        .map_err(|error| {
            format!(
                "failed to update rows in table {table_id}: {}",
                DisplayErrorContext(&error)
            )
        })?;

        Ok(WriteOutcome {
            failed: failures(output.failed_batch_items()),
        })
    }

    fn batch_delete_rows(&self, table_id: &str, row_ids: &[String]) -> Result<WriteOutcome, String> {
        if row_ids.is_empty() {
            return Ok(WriteOutcome::default());
        }

        let output = block_on(
            self.client
                .batch_delete_table_rows()
                .workbook_id(&self.workbook_id)
                .table_id(table_id)
                .set_row_ids(Some(row_ids.to_vec()))
                .send(),
        )
        .map_err(|error| {
            format!(
                "failed to delete rows in table {table_id}: {}",
                DisplayErrorContext(&error)
            )
        })?;

        Ok(WriteOutcome {
            failed: failures(output.failed_batch_items()),
        })
    }

    fn batch_upsert_rows(&self, table_id: &str, rows: &[RowUpsert]) -> Result<UpsertOutcome, String> {
        if rows.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = UpsertRowData::builder()
                .batch_item_id(&row.batch_item_id)
                .filter(filter(&row.formula)?)
                .set_cells_to_update(Some(cell_inputs(&row.cells)))
                .build()
                .map_err(|error| format!("invalid upsert row {}: {error}", row.batch_item_id))?;
            entries.push(entry);
        }

        let output = block_on(
            self.client
                .batch_upsert_table_rows()
                .workbook_id(&self.workbook_id)
                .table_id(table_id)
                .set_rows_to_upsert(Some(entries))
                .send(),
        )
        .map_err(|error| {
            format!(
                "failed to upsert rows in table {table_id}: {}",
                DisplayErrorContext(&error)
            )
        })?;

        let mut upserted = Vec::with_capacity(output.rows().len());
        for (batch_item_id, result) in output.rows() {
            let action = match result.upsert_action() {
                SdkUpsertAction::Appended => UpsertAction::Appended,
                SdkUpsertAction::Updated => UpsertAction::Updated,
                other => return Err(format!("unknown upsert action '{}'", other.as_str())),
            };
            upserted.push((batch_item_id.clone(), action));
        }
        upserted.sort_by(|left, right| left.0.cmp(&right.0));

        Ok(UpsertOutcome {
            rows: upserted,
            failed: failures(output.failed_batch_items()),
        })
    }

    fn start_import_job(&self, request: &ImportJobRequest) -> Result<ImportJobStarted, String> {
        let data_source = ImportDataSource::builder()
            .data_source_config(
                ImportDataSourceConfig::builder()
                    .data_source_url(&request.data_source_url)
                    .build(),
            )
            .build();
        let delimited = DelimitedTextImportOptions::builder()
            .delimiter(&request.options.delimiter)
            .has_header_row(request.options.has_header_row)
            .ignore_empty_rows(request.options.ignore_empty_rows)
            .data_character_encoding(ImportDataCharacterEncoding::Utf8)
            .build()
            .map_err(|error| format!("invalid delimited text options: {error}"))?;

        let output = block_on(
            self.client
                .start_table_data_import_job()
                .workbook_id(&self.workbook_id)
                .destination_table_id(&request.destination_table_id)
                .data_source(data_source)
                .data_format(ImportSourceDataFormat::DelimitedText)
                .import_options(
                    ImportOptions::builder()
                        .delimited_text_options(delimited)
                        .build(),
                )
                .client_request_token(&request.client_request_token)
                .send(),
        )
        .map_err(|error| {
            format!(
                "failed to start import job for table {}: {}",
                request.destination_table_id,
                DisplayErrorContext(&error)
            )
        })?;

        Ok(ImportJobStarted {
            job_id: output.job_id().to_string(),
            job_status: output.job_status().as_str().to_string(),
        })
    }
}
