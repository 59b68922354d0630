//! # Storage Configuration
//!
//! S3 bucket and credentials for the key backup.

use super::{ConfigError, Env};
use zeroize::Zeroizing;

/// S3 destination for backup artifacts
#[derive(Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: Zeroizing<String>,
    /// Endpoint override for S3-compatible stores (MinIO, LocalStack)
    pub endpoint: Option<String>,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl StorageConfig {
    pub(crate) fn load(env: &Env<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            bucket: env.required("AWS_BUCKET_NAME")?,
            region: env.required("AWS_REGION")?,
            access_key_id: env.required("AWS_ACCESS_KEY_ID")?,
            secret_access_key: Zeroizing::new(env.required("AWS_SECRET_ACCESS_KEY")?),
            endpoint: env.get("AWS_S3_ENDPOINT"),
        })
    }
}
