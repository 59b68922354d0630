//! # Rotation Run
//!
//! Drives the `rotate` and `backup` runs through their steps. Steps run strictly in
//! sequence; each one records what it did on the [`RotationOutcome`] before the next
//! is entered, so a failed run still reports everything that already happened.

use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

use super::{
    step_span, NotificationStatus, RotationContext, RotationOutcome, RotationStep, RunState,
};
use crate::backup::{destination_key, serialize_to_durable_format, BackupWriter};
use crate::cluster::ClusterClient;
use crate::config::{ControllerSettings, FailurePolicy, RunMode};
use crate::constants::{INSTANCE_LABEL, SEALING_KEY_LABEL};
use crate::controller::ItemFailure;
use crate::error::RotationError;
use crate::model::SealedKeySecret;
use crate::notifier::{failure_notification, summary_notification, Notifier};
use crate::sanitizer::sanitize;
use crate::selector::{partition_for_demotion, select_active_by_prefix, select_latest_by_creation_time};

pub struct RotationController {
    context: RotationContext,
    cluster: Arc<dyn ClusterClient>,
    writer: BackupWriter,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for RotationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationController")
            .field("context", &self.context)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

impl RotationController {
    pub fn new(
        context: RotationContext,
        cluster: Arc<dyn ClusterClient>,
        writer: BackupWriter,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            context,
            cluster,
            writer,
            notifier,
        }
    }

    /// Run to completion or failure within the configured deadline
    ///
    /// [`RunMode::Backup`] skips `Demoting` and `Restarting`, so the cluster is never
    /// mutated. [`RunMode::Export`] is handled by [`super::export_key`] and behaves
    /// like `Backup` here.
    pub async fn run(&self, mode: RunMode) -> RotationOutcome {
        let mut outcome = RotationOutcome::new(mode);
        let timeout = self.context.run_timeout;

        let result = tokio::time::timeout(timeout, self.drive(mode, &mut outcome)).await;
        outcome.state = match result {
            Ok(Ok(())) => {
                outcome.step = RotationStep::Done;
                RunState::Done
            }
            Ok(Err(err)) => RunState::Failed(err),
            Err(_) => RunState::Failed(RotationError::DeadlineExceeded {
                step: outcome.step,
                timeout_secs: timeout.as_secs(),
            }),
        };

        if let Some(err) = outcome.error() {
            error!(step = %err.step(), reason = err.reason(), "Rotation failed: {}", err);
            self.notify_failure(&outcome).await;
        }
        outcome
    }

    async fn drive(&self, mode: RunMode, outcome: &mut RotationOutcome) -> Result<(), RotationError> {
        let active = fetch_active_key(self.cluster.as_ref(), &self.context.controller, outcome).await?;

        outcome.step = RotationStep::Sanitizing;
        let sanitized = step_span(RotationStep::Sanitizing).in_scope(|| sanitize(&active));

        outcome.step = RotationStep::BackingUp;
        self.back_up(&sanitized, outcome)
            .instrument(step_span(RotationStep::BackingUp))
            .await?;

        if mode == RunMode::Rotate {
            outcome.step = RotationStep::Demoting;
            self.demote_stale_keys(outcome)
                .instrument(step_span(RotationStep::Demoting))
                .await?;

            outcome.step = RotationStep::Restarting;
            self.restart_controller(outcome)
                .instrument(step_span(RotationStep::Restarting))
                .await?;
        }

        outcome.step = RotationStep::Notifying;
        self.notify_summary(outcome)
            .instrument(step_span(RotationStep::Notifying))
            .await
    }

    async fn back_up(
        &self,
        sanitized: &SealedKeySecret,
        outcome: &mut RotationOutcome,
    ) -> Result<(), RotationError> {
        let step = RotationStep::BackingUp;
        let artifact = serialize_to_durable_format(sanitized)
            .map_err(|source| RotationError::Serialization { step, source })?;

        let settings = &self.context.controller;
        let key = destination_key(&settings.namespace, &settings.name);
        let location = self
            .writer
            .write(artifact, &key)
            .await
            .map_err(|source| RotationError::Transport { step, source })?;

        info!(
            "New file: {} has been uploaded to s3: {}",
            location.key, location.bucket
        );
        outcome.artifact = Some(location);
        Ok(())
    }

    async fn demote_stale_keys(&self, outcome: &mut RotationOutcome) -> Result<(), RotationError> {
        let step = RotationStep::Demoting;
        let settings = &self.context.controller;

        // Fresh read: the cluster may have changed since the backup was taken
        let secrets = list_key_secrets(self.cluster.as_ref(), settings, step).await?;
        let latest = select_latest_by_creation_time(&secrets)
            .map_err(|source| RotationError::Selection { step, source })?;
        info!(secret = %latest, "Keeping latest key");
        outcome.latest_key = Some(latest.name.clone());

        for candidate in partition_for_demotion(&secrets, &latest) {
            let already_compromised = candidate.is_compromised();
            let mut demoted = candidate;
            demoted.mark_compromised();

            match self.cluster.update_secret(&demoted).await {
                Ok(()) => {
                    info!(secret = %demoted, already_compromised, "Key has been demoted");
                    outcome.demoted.push(demoted.name);
                }
                Err(source) => match self.context.policies.demotion {
                    FailurePolicy::Abort => {
                        return Err(RotationError::Transport { step, source });
                    }
                    FailurePolicy::Continue => {
                        warn!(secret = %demoted, "Unable to demote key: {}", source);
                        outcome.demotion_failures.push(ItemFailure {
                            target: demoted.to_string(),
                            reason: source.to_string(),
                        });
                    }
                },
            }
        }

        if let Some(partial) = outcome.partial_demotion() {
            warn!("{}", partial);
        }
        Ok(())
    }

    async fn restart_controller(&self, outcome: &mut RotationOutcome) -> Result<(), RotationError> {
        let step = RotationStep::Restarting;
        let settings = &self.context.controller;
        let selector = format!("{INSTANCE_LABEL}={}", settings.instance);

        let pods = self
            .cluster
            .list_pods(&settings.namespace, &selector)
            .await
            .map_err(|source| RotationError::Transport { step, source })?;
        if pods.is_empty() {
            return Err(RotationError::NotFound {
                step,
                resource: "pods",
                selector,
                namespace: settings.namespace.clone(),
            });
        }

        for pod in pods {
            match self.cluster.delete_pod(&pod.namespace, &pod.name).await {
                Ok(()) => {
                    info!(pod = %pod, "Controller pod has been deleted");
                    outcome.restarted_pods.push(pod);
                }
                Err(source) => match self.context.policies.restart {
                    FailurePolicy::Abort => {
                        return Err(RotationError::Transport { step, source });
                    }
                    FailurePolicy::Continue => {
                        warn!(pod = %pod, "Unable to delete controller pod: {}", source);
                        outcome.restart_failures.push(ItemFailure {
                            target: pod.to_string(),
                            reason: source.to_string(),
                        });
                    }
                },
            }
        }
        Ok(())
    }

    async fn notify_summary(&self, outcome: &mut RotationOutcome) -> Result<(), RotationError> {
        let notification =
            summary_notification(&self.context.channel, &self.context.controller, outcome);

        match self.notifier.send(&notification).await {
            Ok(()) => {
                outcome.notification = NotificationStatus::Sent;
                Ok(())
            }
            Err(source) => {
                outcome.notification = NotificationStatus::Failed(source.to_string());
                match self.context.policies.notification {
                    FailurePolicy::Abort => Err(RotationError::Transport {
                        step: RotationStep::Notifying,
                        source,
                    }),
                    FailurePolicy::Continue => {
                        warn!("Unable to send notification: {}", source);
                        Ok(())
                    }
                }
            }
        }
    }

    /// Report a failed run; delivery problems are only logged
    async fn notify_failure(&self, outcome: &RotationOutcome) {
        let Some(err) = outcome.error() else {
            return;
        };
        // The notifier itself just failed
        if err.step() == RotationStep::Notifying {
            return;
        }

        let notification =
            failure_notification(&self.context.channel, &self.context.controller, outcome, err);
        if let Err(e) = self.notifier.send(&notification).await {
            warn!("Unable to send failure notification: {}", e);
        }
    }
}

/// `Fetching` and `Selecting`: list the key secrets and pick the active one
pub(super) async fn fetch_active_key(
    cluster: &dyn ClusterClient,
    settings: &ControllerSettings,
    outcome: &mut RotationOutcome,
) -> Result<SealedKeySecret, RotationError> {
    outcome.step = RotationStep::Fetching;
    let secrets = list_key_secrets(cluster, settings, RotationStep::Fetching)
        .instrument(step_span(RotationStep::Fetching))
        .await?;

    outcome.step = RotationStep::Selecting;
    let active = step_span(RotationStep::Selecting)
        .in_scope(|| select_active_by_prefix(&secrets, &settings.key_prefix, settings.selection))
        .map_err(|source| RotationError::Selection {
            step: RotationStep::Selecting,
            source,
        })?;

    info!(secret = %active, "Found active key");
    outcome.active_key = Some(active.name.clone());
    Ok(active)
}

async fn list_key_secrets(
    cluster: &dyn ClusterClient,
    settings: &ControllerSettings,
    step: RotationStep,
) -> Result<Vec<SealedKeySecret>, RotationError> {
    let secrets = cluster
        .list_secrets(&settings.namespace, SEALING_KEY_LABEL)
        .await
        .map_err(|source| RotationError::Transport { step, source })?;

    if secrets.is_empty() {
        return Err(RotationError::NotFound {
            step,
            resource: "secrets",
            selector: SEALING_KEY_LABEL.to_string(),
            namespace: settings.namespace.clone(),
        });
    }
    Ok(secrets)
}
