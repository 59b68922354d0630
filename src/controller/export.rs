//! `export` run: fetch, select and sanitize the active key, serialize it and write it
//! locally. Nothing is uploaded and the cluster is never mutated.

use std::path::Path;
use tracing::{info, Instrument};

use super::rotation::fetch_active_key;
use super::{step_span, RotationContext, RotationOutcome, RotationStep};
use crate::backup::{serialize_to_durable_format, write_local};
use crate::cluster::ClusterClient;
use crate::config::RunMode;
use crate::error::{RotationError, SerializationError};
use crate::sanitizer::sanitize;

/// A serialized key that has been written locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedKey {
    /// Name of the exported secret
    pub secret: String,
    pub artifact: Vec<u8>,
}

/// Export the active key to `output` (`-` for stdout)
///
/// The run deadline covers the cluster read and the local write.
///
/// # Errors
///
/// Returns the [`RotationError`] of the step that failed, or
/// [`RotationError::DeadlineExceeded`].
pub async fn export_key(
    context: &RotationContext,
    cluster: &dyn ClusterClient,
    output: &Path,
) -> Result<ExportedKey, RotationError> {
    let target = output.to_path_buf();
    export_with(context, cluster, move |artifact| write_local(&target, artifact)).await
}

pub(super) async fn export_with<W>(
    context: &RotationContext,
    cluster: &dyn ClusterClient,
    write: W,
) -> Result<ExportedKey, RotationError>
where
    W: FnOnce(&[u8]) -> Result<(), SerializationError> + Send + 'static,
{
    let mut outcome = RotationOutcome::new(RunMode::Export);
    let timeout = context.run_timeout;

    let run = async {
        let active = fetch_active_key(cluster, &context.controller, &mut outcome).await?;

        outcome.step = RotationStep::Sanitizing;
        let artifact = step_span(RotationStep::Sanitizing)
            .in_scope(|| serialize_to_durable_format(&sanitize(&active)))
            .map_err(|source| RotationError::Serialization {
                step: RotationStep::Sanitizing,
                source,
            })?;

        // Blocking pool, so a stalled stdout pipe still trips the deadline
        let step = RotationStep::BackingUp;
        outcome.step = step;
        let written = artifact.clone();
        tokio::task::spawn_blocking(move || write(&written))
            .instrument(step_span(step))
            .await
            .map_err(|e| RotationError::Serialization {
                step,
                source: SerializationError::Io(std::io::Error::other(e)),
            })?
            .map_err(|source| RotationError::Serialization { step, source })?;

        info!(secret = %active, bytes = artifact.len(), "Key exported");
        Ok::<_, RotationError>(ExportedKey {
            secret: active.name,
            artifact,
        })
    };

    let result = tokio::time::timeout(timeout, run).await;
    match result {
        Ok(result) => result,
        Err(_) => Err(RotationError::DeadlineExceeded {
            step: outcome.step,
            timeout_secs: timeout.as_secs(),
        }),
    }
}
