//! # S3 Object Store
//!
//! Uploads backup artifacts with a single `PutObject` call. S3 stores an object
//! atomically, so a failed upload never leaves a truncated key behind.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::{debug, info};

use super::ObjectStore;
use crate::config::StorageConfig;
use crate::constants::ARTIFACT_CONTENT_TYPE;
use crate::error::TransportError;

/// Name reported for credentials sourced from configuration
const CREDENTIALS_PROVIDER_NAME: &str = "kubeseal-backuper-config";

/// Amazon S3 (or S3-compatible) artifact store
pub struct S3Store {
    client: S3Client,
    region: String,
}

impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl S3Store {
    /// Create an S3 client from static credentials
    pub async fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.as_str(),
            None,
            None,
            CREDENTIALS_PROVIDER_NAME,
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            // S3-compatible stores rarely support virtual-hosted buckets
            info!("Routing S3 requests to custom endpoint {}", endpoint);
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: S3Client::from_conf(builder.build()),
            region: config.region.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn upload(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), TransportError> {
        debug!(bucket, key, bytes = body.len(), "Uploading object");
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(ARTIFACT_CONTENT_TYPE)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                TransportError::new(
                    "upload",
                    format!("s3://{bucket}/{key}"),
                    DisplayErrorContext(e).to_string(),
                )
            })?;
        Ok(())
    }
}
