//! # Failure Policies
//!
//! How each mutating step reacts to a per-item failure, and how the active key is
//! matched. Defaults reproduce the behaviour operators already rely on: demotion
//! keeps going, restart and notification stop the run.

use super::{ConfigError, Env, ExpectedValues};
use std::str::FromStr;

/// Reaction to a failed item within a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log and record the failure, move on to the next item
    Continue,
    /// Fail the whole run at the first failed item
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "abort" => Ok(FailurePolicy::Abort),
            _ => Err(UnknownVariant("continue or abort")),
        }
    }
}

/// How the active key is picked among label-selected secrets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// First secret whose name carries the prefix
    Scan,
    /// Only the first secret returned is considered
    FirstElement,
}

impl FromStr for SelectionMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scan" => Ok(SelectionMode::Scan),
            "first" => Ok(SelectionMode::FirstElement),
            _ => Err(UnknownVariant("scan or first")),
        }
    }
}

/// Value outside an enumerated set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownVariant(pub &'static str);

impl ExpectedValues for UnknownVariant {
    fn expected(&self) -> &'static str {
        self.0
    }
}

/// Per-step failure policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicies {
    /// A single key relabel failing (`DEMOTION_FAILURE_POLICY`)
    pub demotion: FailurePolicy,
    /// A single pod delete failing (`RESTART_FAILURE_POLICY`)
    pub restart: FailurePolicy,
    /// The summary notification failing (`NOTIFICATION_FAILURE_POLICY`)
    pub notification: FailurePolicy,
}

impl Default for FailurePolicies {
    fn default() -> Self {
        Self {
            demotion: FailurePolicy::Continue,
            restart: FailurePolicy::Abort,
            notification: FailurePolicy::Abort,
        }
    }
}

impl FailurePolicies {
    pub(crate) fn load(env: &Env<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            demotion: env.parsed_or_default("DEMOTION_FAILURE_POLICY", defaults.demotion)?,
            restart: env.parsed_or_default("RESTART_FAILURE_POLICY", defaults.restart)?,
            notification: env
                .parsed_or_default("NOTIFICATION_FAILURE_POLICY", defaults.notification)?,
        })
    }
}
