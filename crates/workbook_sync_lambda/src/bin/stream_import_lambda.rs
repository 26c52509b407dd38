use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::json;
use workbook_sync_core::contract::StreamEvent;
use workbook_sync_lambda::adapters::honeycode::HoneycodeWorkbookStore;
use workbook_sync_lambda::config::StreamImportConfig;
use workbook_sync_lambda::handlers::stream_import::handle_stream_event;
use workbook_sync_lambda::logging::log_error;

async fn handle_request(event: LambdaEvent<StreamEvent>) -> Result<String, Error> {
    let config = StreamImportConfig::from_env().map_err(Error::from)?;
    let store = HoneycodeWorkbookStore::connect(&config.access).await;

    match handle_stream_event(event.payload, &config, &store) {
        Ok(outcome) => Ok(outcome.message),
        Err(error) => {
            log_error(
                "stream_import_lambda",
                "invocation_failed",
                json!({ "message": error.message }),
            );
            Err(Error::from(error))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
