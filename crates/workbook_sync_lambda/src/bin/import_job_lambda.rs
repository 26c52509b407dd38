use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::json;
use workbook_sync_core::contract::S3Event;
use workbook_sync_lambda::adapters::honeycode::HoneycodeWorkbookStore;
use workbook_sync_lambda::adapters::s3::S3ObjectStore;
use workbook_sync_lambda::config::ImportJobConfig;
use workbook_sync_lambda::handlers::import_job::{handle_import_event, ImportJobOutcome};
use workbook_sync_lambda::logging::log_error;

async fn handle_request(event: LambdaEvent<S3Event>) -> Result<ImportJobOutcome, Error> {
    let config = ImportJobConfig::from_env().map_err(Error::from)?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let objects = S3ObjectStore::new(aws_sdk_s3::Client::new(&aws_config));
    let store = HoneycodeWorkbookStore::connect(&config.access).await;

    handle_import_event(event.payload, &config, &store, &objects).map_err(|error| {
        log_error(
            "import_job_lambda",
            "invocation_failed",
            json!({ "message": error.message }),
        );
        Error::from(error)
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
