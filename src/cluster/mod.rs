//! # Cluster Access
//!
//! The rotation core talks to Kubernetes only through [`ClusterClient`], so state
//! machine tests can run against a mock.
//!
//! - `kubernetes` - [`KubeCluster`], the `kube`/`k8s-openapi` implementation
//! - `client` - client construction for in-cluster and kubeconfig access

mod client;
mod kubernetes;

pub use self::client::create_client;
pub use self::kubernetes::{label_patch, pod_from_k8s, secret_from_k8s, KubeCluster};

use async_trait::async_trait;

use crate::error::TransportError;
use crate::model::{PodRef, SealedKeySecret, SecretSet};

#[cfg(test)]
use mockall::automock;

/// Operations a rotation needs against the cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List secrets in `namespace` matching `label_selector`, in API order
    async fn list_secrets(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<SecretSet, TransportError>;

    /// List pods in `namespace` matching `label_selector`
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<PodRef>, TransportError>;

    /// Write the secret's labels back to the cluster
    ///
    /// Last write wins: no resource version is sent.
    async fn update_secret(&self, secret: &SealedKeySecret) -> Result<(), TransportError>;

    /// Delete a pod so its workload controller recreates it
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), TransportError>;
}
