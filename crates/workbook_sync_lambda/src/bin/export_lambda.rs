use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};
use workbook_sync_lambda::adapters::honeycode::HoneycodeWorkbookStore;
use workbook_sync_lambda::adapters::s3::S3ObjectStore;
use workbook_sync_lambda::config::ExportConfig;
use workbook_sync_lambda::handlers::export::handle_export;
use workbook_sync_lambda::logging::log_error;

async fn handle_request(_event: LambdaEvent<Value>) -> Result<String, Error> {
    let config = ExportConfig::from_env().map_err(Error::from)?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let objects = S3ObjectStore::new(aws_sdk_s3::Client::new(&aws_config));
    let store = HoneycodeWorkbookStore::connect(&config.access).await;

    match handle_export(&config, Utc::now(), &store, &objects) {
        Ok(outcome) => Ok(outcome.message),
        Err(error) => {
            log_error(
                "export_lambda",
                "invocation_failed",
                json!({ "table": config.table, "message": error.message }),
            );
            Err(Error::from(error))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
