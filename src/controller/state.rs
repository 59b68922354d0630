//! Rotation steps, in execution order.

/// Step of a rotation run
///
/// Runs advance strictly forward; a failure at any step ends the run in the failed
/// state, tagged with the step it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RotationStep {
    Fetching,
    Selecting,
    Sanitizing,
    BackingUp,
    Demoting,
    Restarting,
    Notifying,
    Done,
}

impl RotationStep {
    pub fn as_str(self) -> &'static str {
        match self {
            RotationStep::Fetching => "Fetching",
            RotationStep::Selecting => "Selecting",
            RotationStep::Sanitizing => "Sanitizing",
            RotationStep::BackingUp => "BackingUp",
            RotationStep::Demoting => "Demoting",
            RotationStep::Restarting => "Restarting",
            RotationStep::Notifying => "Notifying",
            RotationStep::Done => "Done",
        }
    }

    /// Whether reaching this step means the cluster may already have been changed
    pub fn mutates_cluster(self) -> bool {
        matches!(self, RotationStep::Demoting | RotationStep::Restarting)
    }
}

impl std::fmt::Display for RotationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
