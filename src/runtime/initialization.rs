//! # Initialization
//!
//! Process setup (rustls, `.env`, tracing) and construction of the run's
//! collaborators from a validated [`BackuperConfig`].

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::backup::{BackupWriter, S3Store};
use crate::cluster::{create_client, ClusterClient, KubeCluster};
use crate::config::BackuperConfig;
use crate::controller::{RotationContext, RotationController};
use crate::notifier::create_notifier;

/// Prepare the process: crypto provider, `.env` file, tracing subscriber
///
/// # Errors
///
/// Returns an error when the rustls crypto provider cannot be installed.
pub fn initialize() -> Result<()> {
    // Must happen before any TLS client is built
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        bail!("Failed to install rustls crypto provider");
    }

    // Loaded before the subscriber so RUST_LOG can come from the file
    let dotenv = dotenvy::dotenv();

    // stderr keeps `export -` output clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kubeseal_backuper=info".into()),
        )
        .init();

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => debug!("Ignoring unreadable environment file: {}", e),
    }

    info!("Starting kubeseal-backuper v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    Ok(())
}

/// Cluster collaborator for the configured access mode
///
/// # Errors
///
/// Returns an error when the Kubernetes client cannot be created.
pub async fn build_cluster(config: &BackuperConfig) -> Result<Arc<dyn ClusterClient>> {
    let client = create_client(&config.cluster).await?;
    Ok(Arc::new(KubeCluster::new(client)))
}

/// Wire a [`RotationController`] for `rotate` and `backup` runs
///
/// # Errors
///
/// Returns an error when storage is not configured or a client cannot be created.
pub async fn build_controller(config: &BackuperConfig) -> Result<RotationController> {
    let storage = config
        .storage
        .as_ref()
        .context("No storage has been configured")?;

    let cluster = build_cluster(config).await?;
    let store = S3Store::new(storage).await;
    let writer = BackupWriter::new(Arc::new(store), storage.bucket.clone());
    let notifier = create_notifier(&config.notifier)?;

    Ok(RotationController::new(
        RotationContext::from_config(config),
        cluster,
        writer,
        notifier,
    ))
}
