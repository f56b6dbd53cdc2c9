use crate::domain::cost::{ArtifactLocation, ReportArtifact};
use crate::storage::ReportStore;
use anyhow::Context;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

const CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[derive(Debug, Clone)]
pub struct S3ReportStore {
    client: Client,
    bucket: String,
}

impl S3ReportStore {
    pub fn new(shared: &aws_config::SdkConfig, bucket: &str) -> Self {
        tracing::debug!(bucket, "S3 report store initialized");
        Self {
            client: Client::new(shared),
            bucket: bucket.to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait::async_trait]
impl ReportStore for S3ReportStore {
    async fn put_report(&self, artifact: &ReportArtifact) -> anyhow::Result<ArtifactLocation> {
        let size = artifact.body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&artifact.key)
            .content_type(CONTENT_TYPE)
            .body(ByteStream::from(artifact.body.clone().into_bytes()))
            .send()
            .await
            .with_context(|| {
                format!(
                    "S3 PutObject failed (bucket={}, key={})",
                    self.bucket, artifact.key
                )
            })?;

        tracing::debug!(bucket = %self.bucket, key = %artifact.key, size, "report object stored");

        Ok(ArtifactLocation {
            bucket: self.bucket.clone(),
            key: artifact.key.clone(),
        })
    }
}
