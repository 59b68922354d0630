//! # Kubernetes Adapter
//!
//! [`ClusterClient`] on top of `kube`, plus the mapping from `k8s-openapi` wire types
//! to the crate's domain types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Pod, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams};
use kube::Client;
use tracing::{debug, warn};

use super::ClusterClient;
use crate::constants::FIELD_MANAGER;
use crate::error::TransportError;
use crate::model::{PodRef, SealedKeySecret, SecretSet};

/// Cluster access through the Kubernetes API
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl std::fmt::Debug for KubeCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCluster").finish_non_exhaustive()
    }
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn list_secrets(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<SecretSet, TransportError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default().labels(label_selector))
            .await
            .map_err(|e| {
                TransportError::new(
                    "list secrets",
                    format!("{namespace} (labels: {label_selector})"),
                    e,
                )
            })?;
        debug!(namespace, label_selector, count = list.items.len(), "Listed secrets");
        Ok(list.items.into_iter().map(secret_from_k8s).collect())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<PodRef>, TransportError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default().labels(label_selector))
            .await
            .map_err(|e| {
                TransportError::new(
                    "list pods",
                    format!("{namespace} (labels: {label_selector})"),
                    e,
                )
            })?;
        debug!(namespace, label_selector, count = list.items.len(), "Listed pods");
        Ok(list.items.into_iter().map(pod_from_k8s).collect())
    }

    async fn update_secret(&self, secret: &SealedKeySecret) -> Result<(), TransportError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &secret.namespace);
        api.patch(
            &secret.name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(label_patch(secret)),
        )
        .await
        .map_err(|e| TransportError::new("update secret", secret.to_string(), e))?;
        Ok(())
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), TransportError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .map_err(|e| TransportError::new("delete pod", format!("{namespace}/{name}"), e))?;
        Ok(())
    }
}

/// JSON merge patch carrying only `metadata.labels`
///
/// No resource version is sent, so the update is last-write-wins, and key material
/// never leaves the process.
pub fn label_patch(secret: &SealedKeySecret) -> serde_json::Value {
    serde_json::json!({
        "metadata": {
            "labels": secret.labels,
        }
    })
}

/// Map a `k8s-openapi` secret to the domain type
pub fn secret_from_k8s(secret: Secret) -> SealedKeySecret {
    let meta = secret.metadata;
    let name = meta.name.unwrap_or_default();

    let creation_timestamp = meta.creation_timestamp.as_ref().and_then(|time| {
        let parsed = timestamp_from_k8s(time);
        if parsed.is_none() {
            warn!(secret = %name, "Unparseable creationTimestamp, ordering it first");
        }
        parsed
    });

    SealedKeySecret {
        type_meta: None,
        namespace: meta.namespace.unwrap_or_default(),
        creation_timestamp,
        resource_version: meta.resource_version,
        uid: meta.uid,
        self_link: meta.self_link,
        labels: meta.labels.unwrap_or_default(),
        annotations: meta.annotations.unwrap_or_default(),
        secret_type: secret.type_,
        data: secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect(),
        name,
    }
}

/// Map a `k8s-openapi` pod to a [`PodRef`]
pub fn pod_from_k8s(pod: Pod) -> PodRef {
    PodRef {
        name: pod.metadata.name.unwrap_or_default(),
        namespace: pod.metadata.namespace.unwrap_or_default(),
    }
}

/// Convert a `meta.v1.Time` through its RFC 3339 wire form
///
/// The time library behind `Time` differs between `k8s-openapi` releases; the wire
/// format does not.
fn timestamp_from_k8s(time: &Time) -> Option<DateTime<Utc>> {
    let value = serde_json::to_value(time).ok()?;
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
