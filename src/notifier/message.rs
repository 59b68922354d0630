//! Summary text for finished and failed runs.

use super::{Notification, NotificationColor};
use crate::config::{ControllerSettings, RunMode};
use crate::controller::{ItemFailure, RotationOutcome};
use crate::error::RotationError;

/// Summary of a run that reached the notification step
pub fn summary_notification(
    channel: &str,
    controller: &ControllerSettings,
    outcome: &RotationOutcome,
) -> Notification {
    let title = match outcome.mode {
        RunMode::Backup => "Sealing key backed up",
        RunMode::Rotate | RunMode::Export => "Sealing key backed up and rotated",
    };
    let color = if outcome.has_item_failures() {
        NotificationColor::Warning
    } else {
        NotificationColor::Good
    };

    Notification {
        channel: channel.to_string(),
        title: title.to_string(),
        color,
        body: describe(controller, outcome),
    }
}

/// Best-effort report for a failed run
pub fn failure_notification(
    channel: &str,
    controller: &ControllerSettings,
    outcome: &RotationOutcome,
    error: &RotationError,
) -> Notification {
    let mut body = format!("Failed at {error}\n");
    if error.step().mutates_cluster() {
        body.push_str("The cluster may have been partially updated.\n");
    }
    body.push_str(&describe(controller, outcome));

    Notification {
        channel: channel.to_string(),
        title: "Sealing key rotation failed".to_string(),
        color: NotificationColor::Danger,
        body,
    }
}

fn describe(controller: &ControllerSettings, outcome: &RotationOutcome) -> String {
    let mut lines = vec![format!(
        "Controller: {}/{}",
        controller.namespace, controller.name
    )];
    if let Some(active) = &outcome.active_key {
        lines.push(format!("Active key: {active}"));
    }
    if let Some(artifact) = &outcome.artifact {
        lines.push(format!(
            "New file: {} has been uploaded to bucket {}",
            artifact.key, artifact.bucket
        ));
    }
    if outcome.mode == RunMode::Rotate {
        if let Some(latest) = &outcome.latest_key {
            lines.push(format!("Latest key: {latest}"));
        }
        lines.push(format!("Demoted keys: {}", list_or_none(&outcome.demoted)));
        push_failures(&mut lines, "Demotion failures", &outcome.demotion_failures);
        let pods: Vec<String> = outcome.restarted_pods.iter().map(ToString::to_string).collect();
        lines.push(format!("Restarted pods: {}", list_or_none(&pods)));
        push_failures(&mut lines, "Restart failures", &outcome.restart_failures);
    }
    lines.join("\n")
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn push_failures(lines: &mut Vec<String>, label: &str, failures: &[ItemFailure]) {
    if failures.is_empty() {
        return;
    }
    lines.push(format!("{label}:"));
    lines.extend(
        failures
            .iter()
            .map(|failure| format!("  - {}: {}", failure.target, failure.reason)),
    );
}
