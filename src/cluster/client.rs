//! # Kubernetes Client Setup

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::info;

use crate::config::{ClusterAccessMode, ClusterConfig};

/// Build a Kubernetes client for the configured access mode
///
/// # Errors
///
/// Returns an error when the in-cluster environment or the kubeconfig file cannot
/// be loaded, or the client cannot be constructed.
pub async fn create_client(config: &ClusterConfig) -> Result<Client> {
    info!(mode = ?config.mode, "Trying to setup kubernetes client");

    let kube_config = match config.mode {
        ClusterAccessMode::Internal => {
            Config::incluster().context("Unable to init internal kubernetes client")?
        }
        ClusterAccessMode::External => {
            let path = config
                .kubeconfig_path
                .as_ref()
                .context("No kubeconfig path has been provided for external mode")?;
            let kubeconfig = Kubeconfig::read_from(path).with_context(|| {
                format!("Unable to read kubeconfig from {}", path.display())
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("Unable to init external kubernetes client")?
        }
    };

    Client::try_from(kube_config).context("Unable to create kubernetes client")
}
