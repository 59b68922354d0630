//! # Rotation Controller
//!
//! The key rotation state machine:
//!
//! ```text
//! Fetching -> Selecting -> Sanitizing -> BackingUp -> Demoting -> Restarting -> Notifying -> Done
//! ```
//!
//! Any step can end the run in the failed state. The backup upload always completes
//! before the first cluster mutation.
//!
//! - `rotation` - [`RotationController`], the `rotate` and `backup` runs
//! - `export` - [`export_key`], fetch, serialize and write locally
//! - `outcome` - [`RotationOutcome`], what a run did
//! - `state` - [`RotationStep`]

mod export;
mod outcome;
mod rotation;
mod state;

#[cfg(test)]
mod tests;

pub use export::{export_key, ExportedKey};
pub use outcome::{ItemFailure, NotificationStatus, RotationOutcome, RunState};
pub use rotation::RotationController;
pub use state::RotationStep;

use std::time::Duration;

use crate::config::{BackuperConfig, ControllerSettings, FailurePolicies};

/// Everything a run needs besides its collaborators
#[derive(Debug, Clone)]
pub struct RotationContext {
    pub controller: ControllerSettings,
    pub policies: FailurePolicies,
    /// Channel summaries are posted to
    pub channel: String,
    pub run_timeout: Duration,
}

impl RotationContext {
    pub fn from_config(config: &BackuperConfig) -> Self {
        Self {
            controller: config.controller.clone(),
            policies: config.policies,
            channel: config.notifier.channel().to_string(),
            run_timeout: config.run_timeout,
        }
    }
}

fn step_span(step: RotationStep) -> tracing::Span {
    tracing::info_span!("rotation.step", step = %step)
}
