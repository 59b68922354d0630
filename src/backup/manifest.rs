//! # Secret Manifest
//!
//! YAML shape of an exported key: a plain Kubernetes `Secret` manifest that can be
//! applied back with `kubectl apply -f`.
//!
//! Fields are declared in alphabetical order so the output matches what
//! `kubectl get secret -o yaml` prints.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::SerializationError;
use crate::model::SealedKeySecret;

/// Exported `Secret` manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SecretManifest {
    pub api_version: String,
    /// Base64-encoded values, as Kubernetes stores them
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
    pub kind: String,
    pub metadata: ManifestMetadata,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,
}

/// Metadata kept in an exported manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManifestMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Always present; `null` once sanitized
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub name: String,
    pub namespace: String,
}

impl SecretManifest {
    /// Build the manifest for a sanitized secret
    ///
    /// # Errors
    ///
    /// [`SerializationError::MissingTypeMeta`] when the secret was not sanitized.
    pub fn from_secret(secret: &SealedKeySecret) -> Result<Self, SerializationError> {
        let type_meta =
            secret
                .type_meta
                .as_ref()
                .ok_or_else(|| SerializationError::MissingTypeMeta {
                    secret: secret.to_string(),
                })?;

        Ok(Self {
            api_version: type_meta.api_version.clone(),
            data: secret
                .data
                .iter()
                .map(|(k, v)| (k.clone(), STANDARD.encode(v)))
                .collect(),
            kind: type_meta.kind.clone(),
            metadata: ManifestMetadata {
                annotations: secret.annotations.clone(),
                creation_timestamp: secret.creation_timestamp,
                labels: secret.labels.clone(),
                name: secret.name.clone(),
                namespace: secret.namespace.clone(),
            },
            secret_type: secret.secret_type.clone(),
        })
    }

    /// Decode the base64 data values
    ///
    /// # Errors
    ///
    /// [`SerializationError::RoundTrip`] when a value is not valid base64.
    pub fn decoded_data(&self) -> Result<BTreeMap<String, Vec<u8>>, SerializationError> {
        self.data
            .iter()
            .map(|(k, v)| {
                STANDARD
                    .decode(v)
                    .map(|bytes| (k.clone(), bytes))
                    .map_err(|e| SerializationError::RoundTrip(format!("data key {k}: {e}")))
            })
            .collect()
    }
}
