//! # Rotation Outcome
//!
//! In-memory record of what a run did. Built up step by step and returned to the
//! runner, which derives the exit code from it. Never persisted.

use super::RotationStep;
use crate::backup::ArtifactLocation;
use crate::config::RunMode;
use crate::error::RotationError;
use crate::model::PodRef;

/// Terminal (or current) state of a run
#[derive(Debug)]
pub enum RunState {
    Running,
    Done,
    Failed(RotationError),
}

/// A per-item failure the run was allowed to continue past
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// `namespace/name` of the secret or pod
    pub target: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    NotAttempted,
    Sent,
    Failed(String),
}

#[derive(Debug)]
pub struct RotationOutcome {
    pub mode: RunMode,
    pub state: RunState,
    /// Last step entered
    pub step: RotationStep,
    pub active_key: Option<String>,
    pub latest_key: Option<String>,
    pub artifact: Option<ArtifactLocation>,
    pub demoted: Vec<String>,
    pub demotion_failures: Vec<ItemFailure>,
    pub restarted_pods: Vec<PodRef>,
    pub restart_failures: Vec<ItemFailure>,
    pub notification: NotificationStatus,
}

impl RotationOutcome {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            state: RunState::Running,
            step: RotationStep::Fetching,
            active_key: None,
            latest_key: None,
            artifact: None,
            demoted: Vec::new(),
            demotion_failures: Vec::new(),
            restarted_pods: Vec::new(),
            restart_failures: Vec::new(),
            notification: NotificationStatus::NotAttempted,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, RunState::Done)
    }

    pub fn error(&self) -> Option<&RotationError> {
        match &self.state {
            RunState::Failed(err) => Some(err),
            RunState::Running | RunState::Done => None,
        }
    }

    /// Demotion failures tolerated under the `continue` policy, as an error value
    pub fn partial_demotion(&self) -> Option<RotationError> {
        if self.demotion_failures.is_empty() {
            return None;
        }
        Some(RotationError::PartialDemotion {
            step: RotationStep::Demoting,
            failed: self.demotion_failures.len(),
            attempted: self.demoted.len() + self.demotion_failures.len(),
        })
    }

    /// Whether any per-item step was allowed to continue past a failure
    pub fn has_item_failures(&self) -> bool {
        !self.demotion_failures.is_empty() || !self.restart_failures.is_empty()
    }
}
