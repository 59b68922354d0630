//! # Sealed Key Secret
//!
//! One generation of the sealing controller's key, as stored in a cluster secret.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::constants::{COMPROMISED_LABEL_VALUE, SEALING_KEY_LABEL};

/// Secrets as returned by a label query, in arrival order (never assumed sorted)
pub type SecretSet = Vec<SealedKeySecret>;

/// Resource type descriptor (`apiVersion` / `kind`)
///
/// The cluster API omits it on reads; the sanitizer restores it so the exported
/// artifact is self-describing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMeta {
    pub api_version: String,
    pub kind: String,
}

/// A sealing key secret
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SealedKeySecret {
    /// `apiVersion`/`kind`, `None` as read from the cluster
    pub type_meta: Option<TypeMeta>,
    /// Secret name, unique within the namespace
    pub name: String,
    pub namespace: String,
    /// Creation time; `None` is the zero instant
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub resource_version: Option<String>,
    pub uid: Option<String>,
    pub self_link: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// Secret type, e.g. `kubernetes.io/tls`
    pub secret_type: Option<String>,
    /// Opaque key material
    pub data: BTreeMap<String, Vec<u8>>,
}

impl SealedKeySecret {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_creation_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.creation_timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Ordering key for "latest" selection
    ///
    /// Creation time at seconds resolution first, then name. A missing timestamp
    /// sorts before every real one.
    pub fn creation_order_key(&self) -> (Option<i64>, &str) {
        (
            self.creation_timestamp.map(|t| t.timestamp()),
            self.name.as_str(),
        )
    }

    /// Whether the key has already been retired
    pub fn is_compromised(&self) -> bool {
        self.labels.get(SEALING_KEY_LABEL).map(String::as_str) == Some(COMPROMISED_LABEL_VALUE)
    }

    /// Mark the key as retired by setting the sealing-key label to the sentinel
    pub fn mark_compromised(&mut self) {
        self.labels.insert(
            SEALING_KEY_LABEL.to_string(),
            COMPROMISED_LABEL_VALUE.to_string(),
        );
    }
}

impl std::fmt::Display for SealedKeySecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
