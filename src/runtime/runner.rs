//! # Runner
//!
//! Top of the call stack below `main`: loads configuration for the chosen mode,
//! runs it and maps the result to an exit code.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use super::exit::{exit_code, EXIT_SUCCESS};
use super::initialization::{build_cluster, build_controller};
use crate::config::{BackuperConfig, RunMode};
use crate::controller::{export_key, RotationContext};

/// Run `rotate` or `backup`
///
/// # Errors
///
/// Returns an error for configuration or client setup failures. A failed run is
/// not an error here: it is logged by the controller and reflected in the exit code.
pub async fn run_rotation(mode: RunMode) -> Result<u8> {
    let config = BackuperConfig::from_env(mode).context("Config error")?;
    info!(
        namespace = %config.controller.namespace,
        controller = %config.controller.name,
        ?mode,
        "Configuration loaded"
    );

    let controller = build_controller(&config).await?;
    let outcome = controller.run(mode).await;

    if outcome.is_done() {
        if let Some(partial) = outcome.partial_demotion() {
            warn!("Run finished with errors: {}", partial);
        } else {
            info!("Run finished successfully");
        }
    }
    Ok(exit_code(&outcome))
}

/// Run `export`, writing the serialized key to `output` (`-` for stdout)
///
/// # Errors
///
/// Returns an error when configuration is invalid, the key cannot be fetched or
/// serialized, the output cannot be written, or the run deadline passes first.
pub async fn run_export(output: &Path) -> Result<u8> {
    let config = BackuperConfig::from_env(RunMode::Export).context("Config error")?;
    let cluster = build_cluster(&config).await?;

    let exported = export_key(&RotationContext::from_config(&config), cluster.as_ref(), output)
        .await
        .with_context(|| format!("Unable to export kubeseal key to {}", output.display()))?;
    info!(secret = %exported.secret, "Export finished");

    Ok(EXIT_SUCCESS)
}
