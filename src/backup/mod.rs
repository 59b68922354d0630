//! # Backup Writer
//!
//! Serializes a sanitized key secret and hands it to object storage.
//!
//! - `manifest` - YAML shape of the exported secret
//! - `s3` - [`ObjectStore`] backed by Amazon S3
//! - `local` - atomic local file output for `export`

mod local;
mod manifest;
mod s3;

pub use local::write_local;
pub use manifest::{ManifestMetadata, SecretManifest};
pub use s3::S3Store;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{SerializationError, TransportError};
use crate::model::SealedKeySecret;

#[cfg(test)]
use mockall::automock;

/// Object storage sink for backup artifacts
///
/// Implementations must be all-or-nothing: either the full body is stored under
/// `key` or an error is returned.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), TransportError>;
}

/// Where an artifact was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub bucket: String,
    pub key: String,
}

impl std::fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Storage key for a controller's key backup: `<namespace>/<controllerName>-key.yaml`
pub fn destination_key(namespace: &str, controller_name: &str) -> String {
    format!("{namespace}/{controller_name}-key.yaml")
}

/// Encode a sanitized secret as pretty YAML
///
/// The encoded bytes are parsed back with unknown fields denied and compared with
/// the source manifest before they are returned, so a successful result is
/// guaranteed to decode to the same data and labels.
///
/// # Errors
///
/// Returns a [`SerializationError`] when the secret was not sanitized, encoding
/// fails, or the encoded form does not decode to the same manifest.
pub fn serialize_to_durable_format(secret: &SealedKeySecret) -> Result<Vec<u8>, SerializationError> {
    let manifest = SecretManifest::from_secret(secret)?;
    let yaml = serde_yaml::to_string(&manifest).map_err(SerializationError::Encode)?;

    let decoded: SecretManifest =
        serde_yaml::from_str(&yaml).map_err(SerializationError::Validate)?;
    if decoded != manifest {
        return Err(SerializationError::RoundTrip(format!(
            "decoded manifest for {secret} differs from the encoded one"
        )));
    }

    debug!(secret = %secret, bytes = yaml.len(), "Serialized key secret");
    Ok(yaml.into_bytes())
}

/// Writes artifacts to a single bucket
#[derive(Clone)]
pub struct BackupWriter {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl std::fmt::Debug for BackupWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupWriter")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl BackupWriter {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Upload an artifact under `destination_key`
    ///
    /// # Errors
    ///
    /// Propagates the store's [`TransportError`]; nothing is considered written then.
    pub async fn write(
        &self,
        artifact: Vec<u8>,
        destination_key: &str,
    ) -> Result<ArtifactLocation, TransportError> {
        let size = artifact.len();
        self.store
            .upload(&self.bucket, destination_key, artifact)
            .await?;

        let location = ArtifactLocation {
            bucket: self.bucket.clone(),
            key: destination_key.to_string(),
        };
        info!(
            bucket = %self.bucket,
            key = %destination_key,
            bytes = size,
            "New key file has been uploaded"
        );
        Ok(location)
    }
}
