//! S3 backend for the Object Store Gateway.

use super::{
    ObjectStore, ObjectStoreError, ObjectStoreResult, validate_bucket_name, validate_object_key,
};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client as S3Client, config::Builder as S3ConfigBuilder, error::DisplayErrorContext,
    presigning::PresigningConfig, primitives::ByteStream,
};
use std::{path::Path, time::Duration};
use tracing::{debug, info, instrument};

/// Connection settings for an S3 or S3-compatible store.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for MinIO/LocalStack.
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from the default credential chain plus `settings`.
    pub async fn new(settings: &S3Settings) -> ObjectStoreResult<Self> {
        validate_bucket_name(&settings.bucket)?;

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.region.clone()))
            .load()
            .await;

        let mut builder = S3ConfigBuilder::from(&aws_config);
        if let Some(ref endpoint_url) = settings.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }
        if settings.force_path_style {
            builder = builder.force_path_style(true);
        }
        let client = S3Client::from_conf(builder.build());

        info!(
            bucket = %settings.bucket,
            region = %settings.region,
            "S3 object store initialized"
        );

        Ok(Self {
            client,
            bucket: settings.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self, source), fields(bucket = %self.bucket))]
    async fn put_object(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> ObjectStoreResult<()> {
        validate_object_key(key)?;

        let body = ByteStream::from_path(source)
            .await
            .map_err(|err| ObjectStoreError::Upload {
                key: key.to_string(),
                message: format!("could not open {}: {err}", source.display()),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| ObjectStoreError::Upload {
                key: key.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            })?;

        debug!("object uploaded to S3");
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String> {
        validate_bucket_name(bucket)?;
        validate_object_key(key)?;

        let presign_err = |message: String| ObjectStoreError::Presign {
            key: key.to_string(),
            message,
        };
        let config =
            PresigningConfig::expires_in(expires_in).map_err(|err| presign_err(err.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|err| presign_err(DisplayErrorContext(&err).to_string()))?;

        Ok(presigned.uri().to_string())
    }
}
