use std::future::Future;
use std::time::Duration;

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;

use crate::adapters::object_store::ObjectStore;

const PRESIGNED_URL_TTL: Duration = Duration::from_secs(15 * 60);

pub struct S3ObjectStore {
    s3_client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(s3_client: aws_sdk_s3::Client) -> Self {
        Self { s3_client }
    }
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

impl ObjectStore for S3ObjectStore {
    fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let client = self.s3_client.clone();
        block_on(async move {
            let output = client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|error| {
                    format!(
                        "failed to read s3://{bucket}/{key}: {}",
                        DisplayErrorContext(&error)
                    )
                })?;
            let body = output
                .body
                .collect()
                .await
                .map_err(|error| format!("failed to stream s3://{bucket}/{key}: {error}"))?;
            Ok(body.into_bytes().to_vec())
        })
    }

    fn write_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String> {
        block_on(
            self.s3_client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(ByteStream::from(body.to_vec()))
                .send(),
        )
        .map(|_| ())
        .map_err(|error| {
            format!(
                "failed to write object to s3://{bucket}/{key}: {}",
                DisplayErrorContext(&error)
            )
        })
    }

    fn presigned_read_url(&self, bucket: &str, key: &str) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(PRESIGNED_URL_TTL)
            .map_err(|error| format!("invalid presigning config: {error}"))?;
        let request = block_on(
            self.s3_client
                .get_object()
                .bucket(bucket)
                .key(key)
                .presigned(presigning),
        )
        .map_err(|error| {
            format!(
                "failed to presign s3://{bucket}/{key}: {}",
                DisplayErrorContext(&error)
            )
        })?;
        Ok(request.uri().to_string())
    }
}
