//! # Error Types
//!
//! Error taxonomy for a rotation run.
//!
//! - [`ConfigError`] - startup validation, always fatal before any work begins
//! - [`NotFoundError`] - a selector matched nothing
//! - [`TransportError`] - cluster, storage or notifier call failed
//! - [`SerializationError`] - the backup artifact could not be encoded
//! - [`RotationError`] - run-level failure, always tagged with the step it happened in

use thiserror::Error;

use crate::controller::RotationStep;

/// Configuration error raised while loading settings from the environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {key}")]
    Missing { key: &'static str },
    #[error("invalid value {value:?} for {key}: expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Selector found nothing to return
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("no secrets to select from")]
    Empty,
    #[error("no secret with prefix {prefix} was found")]
    NoPrefixMatch { prefix: String },
}

/// Failure talking to an external collaborator (cluster, storage, notifier)
#[derive(Debug, Error)]
#[error("{operation} {resource}: {source}")]
pub struct TransportError {
    /// Operation that failed, e.g. `list secrets`
    pub operation: &'static str,
    /// Resource the operation targeted
    pub resource: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    pub fn new(
        operation: &'static str,
        resource: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation,
            resource: resource.into(),
            source: source.into(),
        }
    }
}

/// Backup artifact encoding failure
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("failed to encode secret as YAML: {0}")]
    Encode(#[source] serde_yaml::Error),
    #[error("encoded secret failed strict validation: {0}")]
    Validate(#[source] serde_yaml::Error),
    #[error("secret {secret} has no apiVersion/kind; sanitize it before export")]
    MissingTypeMeta { secret: String },
    #[error("encoded secret does not round-trip: {0}")]
    RoundTrip(String),
    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal run error, tagged with the step it was raised in
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("{step}: no {resource} matching {selector} in namespace {namespace}")]
    NotFound {
        step: RotationStep,
        resource: &'static str,
        selector: String,
        namespace: String,
    },
    #[error("{step}: {source}")]
    Selection {
        step: RotationStep,
        #[source]
        source: NotFoundError,
    },
    #[error("{step}: {source}")]
    Transport {
        step: RotationStep,
        #[source]
        source: TransportError,
    },
    #[error("{step}: {source}")]
    Serialization {
        step: RotationStep,
        #[source]
        source: SerializationError,
    },
    #[error("{step}: {failed} of {attempted} key demotions failed")]
    PartialDemotion {
        step: RotationStep,
        failed: usize,
        attempted: usize,
    },
    #[error("{step}: run deadline of {timeout_secs}s exceeded")]
    DeadlineExceeded {
        step: RotationStep,
        timeout_secs: u64,
    },
}

impl RotationError {
    /// Step the run was in when it failed
    pub fn step(&self) -> RotationStep {
        match self {
            RotationError::NotFound { step, .. }
            | RotationError::Selection { step, .. }
            | RotationError::Transport { step, .. }
            | RotationError::Serialization { step, .. }
            | RotationError::PartialDemotion { step, .. }
            | RotationError::DeadlineExceeded { step, .. } => *step,
        }
    }

    /// Short machine-readable reason for logs
    pub fn reason(&self) -> &'static str {
        match self {
            RotationError::NotFound { .. } | RotationError::Selection { .. } => "not_found",
            RotationError::Transport { .. } => "transport",
            RotationError::Serialization { .. } => "serialization",
            RotationError::PartialDemotion { .. } => "partial_demotion",
            RotationError::DeadlineExceeded { .. } => "deadline_exceeded",
        }
    }
}
